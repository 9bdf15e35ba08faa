//! Outbound request augmentation and response side effects.
//!
//! Every request leaving the client passes through [`RequestAugmenter`]:
//! the bearer token is attached on the way out, and the session-wide
//! reactions to failure statuses run on the way back. The augmenter never
//! swallows an error; the caller still sees the failure.

use lonquiexpress_platform_access::{Navigator, Notice, Notifier, SessionStore, View};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::auth::end_session;
use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Method};

/// What the augmenter did in reaction to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEffect {
    /// Nothing beyond logging.
    None,
    /// The session was ended and the user sent to the login view.
    SessionEnded,
    /// A notice was shown.
    Notified,
}

/// Decorates outbound requests and reacts to failure statuses.
#[derive(Clone)]
pub struct RequestAugmenter {
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    base_url: String,
}

impl RequestAugmenter {
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            notifier,
            base_url: base_url.into(),
        }
    }

    /// Adds the bearer token and, for requests that carry a body, the JSON
    /// content type. Without a token the request goes out unchanged.
    pub fn before_send(&self, request: &mut ApiRequest) {
        if let Some(token) = self.store.token() {
            request.set_header("Authorization", format!("Bearer {}", token.trim()));
        }
        if request.body.is_some() {
            request.set_header_if_absent("Content-Type", "application/json");
        }
    }

    /// Runs the cross-cutting reaction to a response.
    ///
    /// The outcome itself is left to the caller.
    pub fn after_response(
        &self,
        method: Method,
        url: &str,
        outcome: &Result<ApiResponse, TransportError>,
    ) -> ResponseEffect {
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                error!(%method, url, error = %err, "backend unreachable");
                self.notifier.notify(Notice::Unreachable {
                    base_url: self.base_url.clone(),
                });
                return ResponseEffect::Notified;
            }
        };

        match response.status {
            200..=299 => ResponseEffect::None,
            401 => {
                warn!(%method, url, "session rejected by backend");
                if self.navigator.current() != View::Login {
                    self.notifier.notify(Notice::SessionExpired);
                }
                end_session(&self.store, self.navigator.as_ref());
                ResponseEffect::SessionEnded
            }
            403 => {
                warn!(%method, url, "permission denied by backend");
                self.notifier.notify(Notice::PermissionDenied);
                ResponseEffect::Notified
            }
            404 => {
                warn!(%method, url, "resource not found");
                ResponseEffect::None
            }
            status @ 500..=599 => {
                error!(%method, url, status, "server error");
                self.notifier.notify(Notice::ServerError);
                ResponseEffect::Notified
            }
            status => {
                debug!(%method, url, status, "request failed");
                ResponseEffect::None
            }
        }
    }
}

impl std::fmt::Debug for RequestAugmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAugmenter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
