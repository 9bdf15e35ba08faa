//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: credential exchange and session failures
//! - `AuthorizationError`: route and role checks
//! - `StorageError`: persisted session snapshot failures

use crate::navigation::View;
use crate::role::Role;
use std::fmt;

/// Errors from authentication operations.
///
/// These errors represent failures in establishing who the user is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Credentials were rejected locally before any request was made.
    InvalidInput { field: &'static str, reason: String },
    /// The backend refused the credentials.
    Rejected { message: String },
    /// The backend could not be reached or answered with an unexpected status.
    RequestFailed { reason: String },
    /// A login response did not carry a usable token or profile.
    MalformedResponse { reason: String },
    /// The session could not be persisted.
    StorageFailed { reason: String },
    /// A session was requested without a bearer token.
    MissingToken,
    /// The operation needs a logged-in user.
    NotAuthenticated,
}

impl AuthenticationError {
    /// Returns a message suitable for showing next to a login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { reason, .. } => reason.clone(),
            Self::Rejected { message } => message.clone(),
            Self::RequestFailed { .. }
            | Self::MalformedResponse { .. }
            | Self::StorageFailed { .. } => {
                "login failed, please try again".to_string()
            }
            Self::MissingToken | Self::NotAuthenticated => "please log in".to_string(),
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::Rejected { message } => {
                write!(f, "credentials rejected: {message}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "authentication request failed: {reason}")
            }
            Self::MalformedResponse { reason } => {
                write!(f, "malformed authentication response: {reason}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "failed to persist session: {reason}")
            }
            Self::MissingToken => write!(f, "session token is missing"),
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// There is no session.
    NotAuthenticated,
    /// The session's role is missing, unrecognized or not allowed on the view.
    PermissionDenied { role: Option<Role>, view: View },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::PermissionDenied {
                role: Some(role),
                view,
            } => {
                write!(f, "role '{role}' may not enter {}", view.path())
            }
            Self::PermissionDenied { role: None, view } => {
                write!(f, "unrecognized role may not enter {}", view.path())
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors from the key-value storage backing the session snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The storage backend is not available in this environment.
    Unavailable { reason: String },
    /// Reading a key failed.
    ReadFailed { key: String, reason: String },
    /// Writing or removing a key failed.
    WriteFailed { key: String, reason: String },
    /// The backing file exists but is not a valid snapshot.
    Corrupt { reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => {
                write!(f, "storage unavailable: {reason}")
            }
            Self::ReadFailed { key, reason } => {
                write!(f, "failed to read '{key}': {reason}")
            }
            Self::WriteFailed { key, reason } => {
                write!(f, "failed to write '{key}': {reason}")
            }
            Self::Corrupt { reason } => {
                write!(f, "storage is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}
