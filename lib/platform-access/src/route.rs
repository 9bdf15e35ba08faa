//! Route authorization: which roles may enter which view.
//!
//! The authorizer is evaluated synchronously before a protected view is
//! entered. It only reads the session store.

use rootcause::prelude::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::AuthorizationError;
use crate::navigation::{Navigator, View, navigate_once};
use crate::notice::{Notice, Notifier};
use crate::role::{Role, RoleSet};
use crate::session::Session;
use crate::store::SessionStore;

/// Allowed roles of one protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAccessRule {
    pub view: View,
    pub allowed: RoleSet,
}

impl RouteAccessRule {
    #[must_use]
    pub fn new(view: View, allowed: RoleSet) -> Self {
        Self { view, allowed }
    }
}

/// Static table of route rules.
///
/// Views without a rule and not public require a session but no particular
/// role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: HashMap<View, RoleSet>,
}

impl RouteTable {
    /// Creates a table with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Adds or replaces a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: RouteAccessRule) -> Self {
        self.rules.insert(rule.view, rule.allowed);
        self
    }

    /// Returns the allowed set of a view, if it has a rule.
    #[must_use]
    pub fn allowed(&self, view: View) -> Option<&RoleSet> {
        self.rules.get(&view)
    }
}

impl Default for RouteTable {
    /// The dashboard rules of the application.
    fn default() -> Self {
        Self::empty()
            .with_rule(RouteAccessRule::new(
                View::CustomerTracking,
                RoleSet::of(&[Role::Customer]),
            ))
            .with_rule(RouteAccessRule::new(
                View::OperatorParcels,
                RoleSet::of(&[Role::Admin, Role::Operator]),
            ))
            .with_rule(RouteAccessRule::new(
                View::DriverAssigned,
                RoleSet::of(&[Role::Driver]),
            ))
            .with_rule(RouteAccessRule::new(
                View::AdminDashboard,
                RoleSet::of(&[Role::Admin]),
            ))
    }
}

/// Outcome of a route check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny {
        redirect: View,
        reason: AuthorizationError,
    },
}

impl Access {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Gate evaluated before entering a view.
pub struct RouteAuthorizer {
    store: Arc<SessionStore>,
    table: RouteTable,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl RouteAuthorizer {
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        table: RouteTable,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            table,
            navigator,
            notifier,
        }
    }

    /// Decides whether the current session may enter `view`.
    #[must_use]
    pub fn authorize(&self, view: View) -> Access {
        if view.is_public() {
            return Access::Allow;
        }

        let Some(session) = self.store.current() else {
            return Access::Deny {
                redirect: View::Login,
                reason: AuthorizationError::NotAuthenticated,
            };
        };

        if let Some(allowed) = self.table.allowed(view) {
            let role = session.role();
            if !allowed.permits(role) {
                return Access::Deny {
                    redirect: View::Login,
                    reason: AuthorizationError::PermissionDenied { role, view },
                };
            }
        }

        Access::Allow
    }

    /// Like [`authorize`](Self::authorize), returning the session on success.
    ///
    /// # Errors
    ///
    /// Returns the denial reason.
    pub fn require(&self, view: View) -> Result<Session, Report<AuthorizationError>> {
        match self.authorize(view) {
            Access::Allow => self
                .store
                .current()
                .ok_or_else(|| AuthorizationError::NotAuthenticated.into()),
            Access::Deny { reason, .. } => Err(reason.into()),
        }
    }

    /// Runs the gate for a navigation to `view`.
    ///
    /// On denial the user is sent to the redirect view, and a role denial
    /// also raises a permission notice. Returns whether entry is allowed.
    pub fn enter(&self, view: View) -> bool {
        match self.authorize(view) {
            Access::Allow => {
                debug!(%view, "route allowed");
                true
            }
            Access::Deny { redirect, reason } => {
                debug!(%view, %reason, "route denied");
                if matches!(reason, AuthorizationError::PermissionDenied { .. }) {
                    self.notifier.notify(Notice::PermissionDenied);
                }
                navigate_once(self.navigator.as_ref(), redirect);
                false
            }
        }
    }

    /// Returns the home dashboard of the logged-in user.
    ///
    /// `None` when logged out or when the role is unrecognized; such users
    /// stay on the login view.
    #[must_use]
    pub fn landing_view(&self) -> Option<View> {
        self.store
            .current()
            .and_then(|session| session.role())
            .map(home_view)
    }

    /// Sends a logged-in user from the login view to their dashboard.
    ///
    /// Returns true if a redirect happened.
    pub fn redirect_if_logged_in(&self) -> bool {
        match self.landing_view() {
            Some(view) => {
                navigate_once(self.navigator.as_ref(), view);
                true
            }
            None => false,
        }
    }
}

/// Home dashboard of each role.
#[must_use]
pub fn home_view(role: Role) -> View {
    match role {
        Role::Admin => View::AdminDashboard,
        Role::Operator => View::OperatorParcels,
        Role::Driver => View::DriverAssigned,
        Role::Customer => View::CustomerTracking,
    }
}
