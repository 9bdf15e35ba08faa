//! The session store: single source of truth for "am I logged in, and as whom".
//!
//! The in-memory session lives in one `watch` channel. Reading it is a
//! synchronous borrow with no I/O; every change is persisted to the
//! key-value storage as the `token`/`usuario` pair and then published to
//! subscribers.

use rootcause::prelude::Report;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::session::Session;
use crate::storage::KeyValueStorage;
use crate::user::UserProfile;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key of the serialized user profile.
pub const USER_KEY: &str = "usuario";

/// What `restore` found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A complete snapshot was loaded.
    Restored,
    /// Nothing was stored.
    Empty,
    /// The snapshot was incomplete or unreadable and has been erased.
    Discarded,
}

/// Owner of the current session.
///
/// Construct one per application and hand it out as `Arc<SessionStore>`.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    state: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Creates an empty store over `storage`. Call [`restore`](Self::restore)
    /// to pick up a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (state, _) = watch::channel(None);
        Self { storage, state }
    }

    /// Loads the persisted snapshot into memory.
    ///
    /// Never fails: an incomplete, unreadable or unparseable snapshot is
    /// erased and the store stays logged out.
    pub fn restore(&self) -> RestoreOutcome {
        let token = self.read_key(TOKEN_KEY);
        let user = self.read_key(USER_KEY);

        let (token, user) = match (token, user) {
            (Ok(None), Ok(None)) => {
                self.publish(None);
                return RestoreOutcome::Empty;
            }
            (Ok(Some(token)), Ok(Some(user))) => (token, user),
            (token, user) => {
                warn!(
                    has_token = matches!(token, Ok(Some(_))),
                    has_user = matches!(user, Ok(Some(_))),
                    "discarding incomplete session snapshot"
                );
                self.discard();
                return RestoreOutcome::Discarded;
            }
        };

        let profile = match serde_json::from_str::<UserProfile>(&user) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(error = %err, "discarding unparseable session profile");
                self.discard();
                return RestoreOutcome::Discarded;
            }
        };

        match Session::new(token, profile) {
            Ok(session) => {
                debug!(user_id = %session.user_id(), "session restored");
                self.publish(Some(session));
                RestoreOutcome::Restored
            }
            Err(err) => {
                warn!(error = %err, "discarding session snapshot");
                self.discard();
                RestoreOutcome::Discarded
            }
        }
    }

    /// Replaces the current session and persists it.
    ///
    /// Token and profile are written as one unit. On failure neither the
    /// persisted pair nor the in-memory session changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn set(&self, session: Session) -> Result<(), Report<StorageError>> {
        self.persist(&session)?;
        debug!(user_id = %session.user_id(), "session set");
        self.publish(Some(session));
        Ok(())
    }

    /// Replaces the profile of the current session, keeping its token.
    ///
    /// Does nothing when logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn update_profile(&self, profile: UserProfile) -> Result<(), Report<StorageError>> {
        let Some(current) = self.current() else {
            debug!("ignoring profile update while logged out");
            return Ok(());
        };
        self.set(current.with_user(profile))
    }

    /// Logs out locally: empties memory and erases the persisted pair.
    ///
    /// The in-memory session is cleared even if erasing storage fails, so
    /// the user is never left logged in by a storage error.
    pub fn clear(&self) {
        self.publish(None);
        if let Err(err) = self.storage.remove_all(&[TOKEN_KEY, USER_KEY]) {
            warn!(error = %err, "failed to erase persisted session");
        }
        debug!("session cleared");
    }

    /// Returns the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Returns the current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .map(|session| session.token().to_string())
    }

    /// Returns true if a session exists.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Subscribes to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    fn persist(&self, session: &Session) -> Result<(), Report<StorageError>> {
        let user = serde_json::to_string(session.user()).map_err(|e| StorageError::WriteFailed {
            key: USER_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.storage
            .write_all(&[(TOKEN_KEY, session.token()), (USER_KEY, &user)])
    }

    fn read_key(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
        self.storage
            .get(key)
            .map(|value| value.filter(|v| !v.trim().is_empty()))
    }

    fn discard(&self) {
        self.clear();
    }

    fn publish(&self, session: Option<Session>) {
        self.state.send_replace(session);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
