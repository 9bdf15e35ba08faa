//! Session of the logged-in user.
//!
//! A session pairs the bearer token issued at login with the profile of the
//! account it belongs to. One without the other is not a session.

use lonquiexpress_core::UserId;
use rootcause::prelude::Report;
use std::fmt;

use crate::error::AuthenticationError;
use crate::role::Role;
use crate::user::UserProfile;

/// An authenticated session: bearer token plus user profile.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user: UserProfile,
}

impl Session {
    /// Creates a session from a bearer token and the profile it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError::MissingToken` if the token is blank.
    pub fn new(
        token: impl Into<String>,
        user: UserProfile,
    ) -> Result<Self, Report<AuthenticationError>> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AuthenticationError::MissingToken.into());
        }
        Ok(Self { token, user })
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the user profile.
    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Returns the authenticated user's ID.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.user.id()
    }

    /// Returns the user's role, if recognized.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.role()
    }

    /// Returns true if the user has admin access.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(|role| role.is_admin())
    }

    /// Returns the same session with a refreshed profile.
    #[must_use]
    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = user;
        self
    }
}

// The token never goes to logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}
