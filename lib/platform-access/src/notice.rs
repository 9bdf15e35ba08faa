//! User-facing notices raised by cross-cutting session and request handling.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A message surfaced to the user outside any particular view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The backend rejected the session; the user was logged out.
    SessionExpired,
    /// The user may not perform the action or enter the view.
    PermissionDenied,
    /// The backend failed; retrying later may help.
    ServerError,
    /// The backend could not be reached.
    Unreachable { base_url: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionExpired => {
                write!(f, "Your session has expired. Please log in again.")
            }
            Self::PermissionDenied => {
                write!(f, "You do not have permission to perform this action.")
            }
            Self::ServerError => write!(f, "Server error. Please try again later."),
            Self::Unreachable { base_url } => {
                write!(f, "Connection error. Check that the server at {base_url} is running.")
            }
        }
    }
}

/// Shows notices to the user.
pub trait Notifier: Send + Sync {
    /// Shows a notice.
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::info!(%notice, "notice");
    }
}

/// Notifier that keeps every notice, for headless clients and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the recorded notices.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

/// Notifier using `window.alert`.
#[cfg(feature = "web")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNotifier;

#[cfg(feature = "web")]
impl Notifier for BrowserNotifier {
    fn notify(&self, notice: Notice) {
        if let Some(window) = web_sys::window() {
            if let Err(err) = window.alert_with_message(&notice.to_string()) {
                tracing::warn!(error = ?err, "alert failed");
            }
        }
    }
}
