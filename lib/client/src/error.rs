//! Error types for the client crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `TransportError`: the request never produced an HTTP status
//! - `ApiError`: a backend call failed, classified by status
//! - `ConfigError`: client configuration could not be loaded

use std::fmt;

/// Failures below the HTTP layer.
///
/// An HTTP status, whatever its value, is never a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server could not be reached.
    Unreachable { reason: String },
    /// No response arrived in time.
    Timeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { reason } => write!(f, "server unreachable: {reason}"),
            Self::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors from backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Input was rejected locally; no request was sent.
    InvalidInput { field: &'static str, reason: String },
    /// The request body could not be encoded.
    Encode { reason: String },
    /// 401: the bearer token was missing, expired or revoked.
    Unauthorized { message: Option<String> },
    /// 403: the account may not perform the operation.
    Forbidden { message: Option<String> },
    /// 404.
    NotFound { path: String },
    /// 5xx.
    Server { status: u16, message: Option<String> },
    /// Any other non-success status.
    Status { status: u16, message: Option<String> },
    /// No HTTP status was received.
    Unreachable { reason: String },
    /// A success response did not have the expected shape.
    Decode { reason: String },
    /// The server accepted the call but the local session copy could not be
    /// written.
    Storage { reason: String },
    /// The owning request scope was torn down.
    Cancelled,
}

impl ApiError {
    /// Classifies a non-success status.
    #[must_use]
    pub fn from_status(status: u16, path: &str, message: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound {
                path: path.to_string(),
            },
            500..=599 => Self::Server { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// Returns the HTTP status, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the message the backend put in the error body.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Server { message, .. }
            | Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::Unreachable {
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::Encode { reason } => write!(f, "failed to encode request: {reason}"),
            Self::Unauthorized { message } => write_status(f, "unauthorized", message),
            Self::Forbidden { message } => write_status(f, "forbidden", message),
            Self::NotFound { path } => write!(f, "not found: {path}"),
            Self::Server { status, message } => {
                write_status(f, &format!("server error {status}"), message)
            }
            Self::Status { status, message } => {
                write_status(f, &format!("unexpected status {status}"), message)
            }
            Self::Unreachable { reason } => write!(f, "request failed: {reason}"),
            Self::Decode { reason } => write!(f, "failed to decode response: {reason}"),
            Self::Storage { reason } => write!(f, "failed to persist session: {reason}"),
            Self::Cancelled => write!(f, "request cancelled"),
        }
    }
}

fn write_status(f: &mut fmt::Formatter<'_>, label: &str, message: &Option<String>) -> fmt::Result {
    match message {
        Some(message) => write!(f, "{label}: {message}"),
        None => f.write_str(label),
    }
}

impl std::error::Error for ApiError {}

/// Errors loading client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    Load { reason: String },
    /// A value is out of range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
