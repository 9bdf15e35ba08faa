//! Views of the application and the navigation seam.
//!
//! The dashboards themselves live outside this crate. What the session and
//! routing logic needs is the set of views, their paths, and a way to send
//! the user somewhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A routable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Public entry view.
    Login,
    /// Customer parcel tracking.
    CustomerTracking,
    /// Operator parcel management.
    OperatorParcels,
    /// Parcels assigned to the logged-in driver.
    DriverAssigned,
    /// Administration dashboard.
    AdminDashboard,
}

impl View {
    /// All views.
    pub const ALL: [View; 5] = [
        View::Login,
        View::CustomerTracking,
        View::OperatorParcels,
        View::DriverAssigned,
        View::AdminDashboard,
    ];

    /// Returns the URL path of the view.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::CustomerTracking => "/usuario/tracking",
            Self::OperatorParcels => "/operador/encomiendas",
            Self::DriverAssigned => "/chofer/asignadas",
            Self::AdminDashboard => "/admin/dashboard",
        }
    }

    /// Resolves a URL path to a view.
    ///
    /// Query strings, fragments and trailing slashes are ignored. The root
    /// path and anything unknown land on the login view.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        View::ALL
            .into_iter()
            .find(|view| view.path() == path)
            .unwrap_or(View::Login)
    }

    /// Returns true for views reachable without a session.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Login)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Moves the user between views.
pub trait Navigator: Send + Sync {
    /// Returns the view currently displayed.
    fn current(&self) -> View;

    /// Replaces the current view.
    fn navigate(&self, view: View);
}

/// Navigates to `view` unless the user is already there.
pub fn navigate_once(navigator: &dyn Navigator, view: View) {
    if navigator.current() != view {
        navigator.navigate(view);
    }
}

/// Navigator that keeps the current view in memory and records every move.
///
/// Used by headless clients and tests.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<(View, Vec<View>)>,
}

impl MemoryNavigator {
    /// Creates a navigator positioned on `start`.
    #[must_use]
    pub fn new(start: View) -> Self {
        Self {
            state: Mutex::new((start, Vec::new())),
        }
    }

    /// Returns every view navigated to, in order.
    #[must_use]
    pub fn history(&self) -> Vec<View> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .1
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(View::Login)
    }
}

impl Navigator for MemoryNavigator {
    fn current(&self) -> View {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    fn navigate(&self, view: View) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0 = view;
        state.1.push(view);
    }
}

/// Navigator over `window.location`.
#[cfg(feature = "web")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNavigator;

#[cfg(feature = "web")]
impl Navigator for BrowserNavigator {
    fn current(&self) -> View {
        web_sys::window()
            .and_then(|window| window.location().pathname().ok())
            .map_or(View::Login, |path| View::resolve(&path))
    }

    fn navigate(&self, view: View) {
        let Some(window) = web_sys::window() else {
            tracing::warn!(%view, "no window to navigate");
            return;
        };
        if let Err(err) = window.location().replace(view.path()) {
            tracing::warn!(%view, error = ?err, "navigation failed");
        }
    }
}
