//! Credential exchange and account operations.
//!
//! The [`Authenticator`] turns email and password into a stored session and
//! tears sessions down again. Account administration endpoints live here too
//! since they share the `/auth` prefix.

use lonquiexpress_core::UserId;
use lonquiexpress_platform_access::{
    AuthenticationError, Navigator, Role, Session, SessionStore, UserProfile, View, navigate_once,
};
use rootcause::prelude::Report;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, encode, route};
use crate::error::ApiError;
use crate::models::{
    Ack, ItemEnvelope, ListEnvelope, LoginRequest, LoginResponse, NewAccount, PasswordChange,
    ProfileChanges,
};
use crate::transport::Method;

/// Local password rules checked before any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl PasswordPolicy {
    #[must_use]
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Checks a password.
    ///
    /// # Errors
    ///
    /// Returns the reason the password is unacceptable.
    pub fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!("must be at least {} characters", self.min_length));
        }
        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Ends the session locally and returns to the login view.
///
/// Shared by explicit logout and by the reaction to a 401.
pub(crate) fn end_session(store: &SessionStore, navigator: &dyn Navigator) {
    store.clear();
    navigate_once(navigator, View::Login);
}

/// Logs users in and out, and manages accounts.
pub struct Authenticator {
    api: ApiClient,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    policy: PasswordPolicy,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        api: ApiClient,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            api,
            store,
            navigator,
            policy,
        }
    }

    /// Exchanges credentials for a session.
    ///
    /// Input is validated locally first; invalid input never reaches the
    /// network. On success the session is persisted and published before
    /// this returns. On failure the store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `Rejected` with the server message,
    /// `RequestFailed`, `MalformedResponse` or `StorageFailed`.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, Report<AuthenticationError>> {
        let email = email.trim();
        validate_email(email)?;
        self.policy
            .check(password)
            .map_err(|reason| AuthenticationError::InvalidInput {
                field: "password",
                reason,
            })?;

        let body = encode(&LoginRequest { email, password }).map_err(request_failed)?;
        let response: LoginResponse = self
            .api
            .call(Method::Post, "/auth/login", Some(body))
            .await
            .map_err(login_failure)?;

        if !response.success {
            return Err(AuthenticationError::Rejected {
                message: response
                    .message
                    .unwrap_or_else(|| "invalid credentials".to_string()),
            }
            .into());
        }
        let token = response
            .token
            .ok_or_else(|| malformed("response has no token"))?;
        let user = response
            .user
            .ok_or_else(|| malformed("response has no user"))?;

        let session = Session::new(token, user)?;
        self.store
            .set(session.clone())
            .map_err(|err| AuthenticationError::StorageFailed {
                reason: err.to_string(),
            })?;

        info!(
            user_id = %session.user_id(),
            role = ?session.role(),
            "logged in"
        );
        Ok(session)
    }

    /// Ends the session locally and navigates to the login view.
    ///
    /// Purely local; the server is not contacted.
    pub fn logout(&self) {
        if let Some(session) = self.store.current() {
            info!(user_id = %session.user_id(), "logged out");
        }
        end_session(&self.store, self.navigator.as_ref());
    }

    /// Returns true if a session exists.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.store.is_logged_in()
    }

    /// Returns the current session.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.store.current()
    }

    /// Returns true if the current user's role is in `roles`.
    ///
    /// False when logged out or when the role is unrecognized.
    #[must_use]
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.store
            .current()
            .and_then(|session| session.role())
            .is_some_and(|role| roles.contains(&role))
    }

    /// Asks the backend whether the stored token is still valid.
    ///
    /// Any failure ends the session.
    ///
    /// # Errors
    ///
    /// Returns the failure after logging out.
    #[instrument(skip(self))]
    pub async fn validate_token(&self) -> Result<bool, Report<ApiError>> {
        #[derive(Deserialize)]
        struct Validation {
            #[serde(alias = "valido", alias = "success", default)]
            valid: bool,
        }

        if !self.store.is_logged_in() {
            return Ok(false);
        }
        match self
            .api
            .call::<Validation>(Method::Get, "/auth/validar", None)
            .await
        {
            Ok(validation) => {
                if !validation.valid {
                    debug!("backend reports token invalid");
                    self.logout();
                }
                Ok(validation.valid)
            }
            Err(err) => {
                warn!(error = %err, "token validation failed");
                self.logout();
                Err(err.into())
            }
        }
    }

    /// Updates the own profile and the stored copy of it.
    ///
    /// # Errors
    ///
    /// Returns the request failure, `Decode` if no profile came back, or
    /// `Storage` if the updated profile could not be persisted.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, Report<ApiError>> {
        let profile = self
            .api
            .call::<ItemEnvelope<UserProfile>>(Method::Patch, "/auth/perfil", Some(encode(changes)?))
            .await?
            .into_inner();
        self.store
            .update_profile(profile.clone())
            .map_err(|err| ApiError::Storage {
                reason: err.to_string(),
            })?;
        Ok(profile)
    }

    /// Changes the own password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the new password breaks the policy, or the
    /// request failure.
    #[instrument(skip_all)]
    pub async fn change_password(&self, current: &str, new: &str) -> Result<Ack, Report<ApiError>> {
        self.policy
            .check(new)
            .map_err(|reason| ApiError::InvalidInput {
                field: "new_password",
                reason,
            })?;
        let body = encode(&PasswordChange { current, new })?;
        Ok(self
            .api
            .call(Method::Post, "/auth/cambiar-password", Some(body))
            .await?)
    }

    /// Creates an account. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad email or password, or the request
    /// failure.
    #[instrument(skip(self, account), fields(email = %account.email, role = %account.role))]
    pub async fn register_user(&self, account: &NewAccount) -> Result<UserProfile, Report<ApiError>> {
        validate_email(account.email.trim()).map_err(|_| ApiError::InvalidInput {
            field: "email",
            reason: "must be a valid email address".to_string(),
        })?;
        self.policy
            .check(&account.password)
            .map_err(|reason| ApiError::InvalidInput {
                field: "password",
                reason,
            })?;
        Ok(self
            .api
            .call::<ItemEnvelope<UserProfile>>(Method::Post, "/auth/registrar", Some(encode(account)?))
            .await?
            .into_inner())
    }

    /// Lists all accounts. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, Report<ApiError>> {
        Ok(self
            .api
            .call::<ListEnvelope<UserProfile>>(Method::Get, "/auth/usuarios", None)
            .await?
            .into_vec())
    }

    /// Deletes an account. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &UserId) -> Result<Ack, Report<ApiError>> {
        let path = route(&["auth", "usuarios", id.as_str()], &[])?;
        Ok(self.api.call(Method::Delete, &path, None).await?)
    }

    /// Changes the role of an account. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns the request failure.
    #[instrument(skip(self))]
    pub async fn change_user_role(&self, id: &UserId, role: Role) -> Result<Ack, Report<ApiError>> {
        let path = route(&["auth", "usuarios", id.as_str(), "rol"], &[])?;
        Ok(self
            .api
            .call(Method::Patch, &path, Some(json!({ "rol": role })))
            .await?)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("api", &self.api)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Checks the shape of an email address: one `@` between a non-empty local
/// part and a non-empty domain, no whitespace.
fn validate_email(email: &str) -> Result<(), AuthenticationError> {
    let invalid = |reason: &str| AuthenticationError::InvalidInput {
        field: "email",
        reason: reason.to_string(),
    };
    if email.is_empty() {
        return Err(invalid("is required"));
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if well_formed {
        Ok(())
    } else {
        Err(invalid("must be a valid email address"))
    }
}

fn login_failure(err: ApiError) -> AuthenticationError {
    match err {
        ApiError::Unauthorized { message }
        | ApiError::Forbidden { message }
        | ApiError::Status { message, .. } => AuthenticationError::Rejected {
            message: message.unwrap_or_else(|| "invalid credentials".to_string()),
        },
        ApiError::Decode { reason } => AuthenticationError::MalformedResponse { reason },
        other => request_failed(other),
    }
}

fn request_failed(err: ApiError) -> AuthenticationError {
    AuthenticationError::RequestFailed {
        reason: err.to_string(),
    }
}

fn malformed(reason: &str) -> AuthenticationError {
    AuthenticationError::MalformedResponse {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::RequestAugmenter;
    use crate::testing::{BASE_URL, Harness, admin_session, harness};
    use lonquiexpress_platform_access::{
        MemoryStorage, Notice, RecordingNotifier, RouteAuthorizer, RouteTable, TOKEN_KEY, USER_KEY,
        KeyValueStorage, StorageError,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    fn authenticator(h: &Harness) -> Authenticator {
        Authenticator::new(
            h.api.clone(),
            h.store.clone(),
            h.navigator.clone(),
            PasswordPolicy::default(),
        )
    }

    fn login_ok() -> serde_json::Value {
        json!({
            "success": true,
            "token": "jwt-abc",
            "usuario": {"_id": "u-1", "email": "admin@x.cl", "nombre": "Ana", "rol": "admin"}
        })
    }

    #[tokio::test]
    async fn login_stores_session_and_gates_routes() {
        let h = harness();
        h.transport.reply(200, login_ok());
        let auth = authenticator(&h);

        let session = auth.login("admin@x.cl", "secret1").await.expect("login");

        assert_eq!(session.token(), "jwt-abc");
        assert_eq!(session.role(), Some(Role::Admin));
        assert_eq!(h.store.current(), Some(session));
        assert_eq!(h.storage.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-abc"));
        assert!(h.storage.get(USER_KEY).unwrap().is_some());

        let request = h.transport.last_request();
        assert_eq!(request.url, "http://localhost:3000/api/auth/login");
        assert_eq!(
            request.body,
            Some(json!({"email": "admin@x.cl", "password": "secret1"}))
        );
        assert!(request.header("Authorization").is_none());

        let authorizer = RouteAuthorizer::new(
            h.store.clone(),
            RouteTable::default(),
            h.navigator.clone(),
            Arc::new(RecordingNotifier::new()),
        );
        assert!(authorizer.authorize(View::AdminDashboard).is_allowed());
        assert!(!authorizer.authorize(View::DriverAssigned).is_allowed());
    }

    #[tokio::test]
    async fn short_password_never_reaches_network() {
        let h = harness();
        let auth = authenticator(&h);

        let err = auth.login("admin@x.cl", "12345").await.unwrap_err();

        assert!(err.to_string().contains("invalid password"));
        assert!(h.transport.requests().is_empty());
        assert!(!h.store.is_logged_in());
    }

    #[tokio::test]
    async fn malformed_email_never_reaches_network() {
        let h = harness();
        let auth = authenticator(&h);

        for email in ["", "admin", "admin@", "@x.cl", "ad min@x.cl"] {
            assert!(auth.login(email, "secret1").await.is_err(), "{email}");
        }
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_carries_server_message_and_leaves_store() {
        let h = harness();
        h.transport
            .reply(401, json!({"success": false, "message": "Credenciales inválidas"}));
        let auth = authenticator(&h);

        let err = auth.login("admin@x.cl", "wrong-pass").await.unwrap_err();

        assert!(err.to_string().contains("Credenciales inválidas"));
        assert!(!h.store.is_logged_in());
        assert!(h.storage.is_empty());
        assert!(h.notifier.take().is_empty());
    }

    #[tokio::test]
    async fn unsuccessful_body_is_rejected() {
        let h = harness();
        h.transport
            .reply(200, json!({"success": false, "message": "Usuario inactivo"}));
        let auth = authenticator(&h);

        let err = auth.login("admin@x.cl", "secret1").await.unwrap_err();

        assert!(err.to_string().contains("Usuario inactivo"));
        assert!(!h.store.is_logged_in());
    }

    #[tokio::test]
    async fn login_without_token_is_malformed() {
        let h = harness();
        h.transport.reply(
            200,
            json!({"success": true, "usuario": {"id": "1", "email": "a@x.cl", "nombre": "A"}}),
        );
        let auth = authenticator(&h);

        let err = auth.login("a@x.cl", "secret1").await.unwrap_err();

        assert!(err.to_string().contains("malformed"));
        assert!(!h.store.is_logged_in());
    }

    #[tokio::test]
    async fn unreachable_server_fails_login() {
        let h = harness();
        let auth = authenticator(&h);

        let err = auth.login("admin@x.cl", "secret1").await.unwrap_err();

        assert!(err.to_string().contains("authentication request failed"));
        assert_eq!(
            h.notifier.take(),
            vec![Notice::Unreachable {
                base_url: "http://localhost:3000/api".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn logout_clears_everything_and_returns_to_login() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.navigator.navigate(View::AdminDashboard);
        let auth = authenticator(&h);

        auth.logout();

        assert!(!auth.is_logged_in());
        assert!(h.storage.is_empty());
        assert_eq!(h.navigator.current(), View::Login);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_role_logs_in_but_enters_nothing() {
        let h = harness();
        h.transport.reply(
            200,
            json!({
                "success": true,
                "token": "t",
                "usuario": {"id": "9", "email": "r@x.cl", "nombre": "R", "rol": "root"}
            }),
        );
        let auth = authenticator(&h);

        let session = auth.login("r@x.cl", "secret1").await.expect("login");

        assert_eq!(session.role(), None);
        assert!(!auth.has_role(&Role::ALL));
    }

    #[tokio::test]
    async fn validate_token_failure_logs_out() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.transport.reply(500, json!({}));
        let auth = authenticator(&h);

        assert!(auth.validate_token().await.is_err());
        assert!(!h.store.is_logged_in());
    }

    #[tokio::test]
    async fn validate_token_success_keeps_session() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.transport.reply(200, json!({"valido": true}));
        let auth = authenticator(&h);

        assert!(auth.validate_token().await.expect("valid"));
        assert!(h.store.is_logged_in());
        assert_eq!(h.transport.last_request().header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn update_profile_refreshes_stored_user() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        h.transport.reply(
            200,
            json!({"usuario": {"_id": "u-1", "email": "admin@x.cl", "nombre": "Ana María", "rol": "admin"}}),
        );
        let auth = authenticator(&h);

        let changes = ProfileChanges {
            display_name: Some("Ana María".to_string()),
            ..ProfileChanges::default()
        };
        let profile = auth.update_profile(&changes).await.expect("update");

        assert_eq!(profile.display_name(), "Ana María");
        let session = h.store.current().expect("still logged in");
        assert_eq!(session.token(), "tok");
        assert_eq!(session.user().display_name(), "Ana María");
        assert_eq!(h.transport.last_request().body, Some(json!({"nombre": "Ana María"})));
    }

    /// Memory store whose writes can be switched off.
    #[derive(Default)]
    struct ReadOnlyAfterLogin {
        inner: MemoryStorage,
        frozen: AtomicBool,
    }

    impl KeyValueStorage for ReadOnlyAfterLogin {
        fn get(&self, key: &str) -> Result<Option<String>, Report<StorageError>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), Report<StorageError>> {
            if self.frozen.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailed {
                    key: key.to_string(),
                    reason: "quota exceeded".to_string(),
                }
                .into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), Report<StorageError>> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn update_profile_reports_storage_failure() {
        let h = harness();
        let storage = Arc::new(ReadOnlyAfterLogin::default());
        let store = Arc::new(SessionStore::new(storage.clone()));
        store.set(admin_session("tok")).expect("set");
        let augmenter = RequestAugmenter::new(
            store.clone(),
            h.navigator.clone(),
            h.notifier.clone(),
            BASE_URL,
        );
        let auth = Authenticator::new(
            ApiClient::new(BASE_URL, h.transport.clone(), augmenter),
            store.clone(),
            h.navigator.clone(),
            PasswordPolicy::default(),
        );

        storage.frozen.store(true, Ordering::SeqCst);
        h.transport.reply(
            200,
            json!({"usuario": {"_id": "u-1", "email": "admin@x.cl", "nombre": "Ana María", "rol": "admin"}}),
        );
        let changes = ProfileChanges {
            display_name: Some("Ana María".to_string()),
            ..ProfileChanges::default()
        };
        let err = auth.update_profile(&changes).await.unwrap_err();

        assert!(err.to_string().contains("failed to persist session"));
        assert!(!err.to_string().contains("decode"));
    }

    #[tokio::test]
    async fn change_password_checks_policy_and_sends_both() {
        let h = harness();
        let auth = authenticator(&h);
        assert!(auth.change_password("secret1", "123").await.is_err());
        assert!(h.transport.requests().is_empty());

        h.transport.reply(200, json!({"success": true}));
        let ack = auth.change_password("secret1", "secret2").await.expect("ok");

        assert_eq!(ack.success, Some(true));
        assert_eq!(
            h.transport.last_request().body,
            Some(json!({"passwordActual": "secret1", "passwordNueva": "secret2"}))
        );
    }

    #[tokio::test]
    async fn account_administration_endpoints() {
        let h = harness();
        h.store.set(admin_session("tok")).expect("set");
        let auth = authenticator(&h);

        h.transport.reply(
            200,
            json!({"usuarios": [
                {"_id": "1", "email": "a@x.cl", "nombre": "A", "rol": "chofer"},
                {"_id": "2", "email": "b@x.cl", "nombre": "B", "rol": "usuario"}
            ]}),
        );
        let users = auth.list_users().await.expect("list");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].role(), Some(Role::Driver));

        h.transport.reply(200, json!({"success": true}));
        auth.change_user_role(&UserId::new("2"), Role::Operator)
            .await
            .expect("role");
        let request = h.transport.last_request();
        assert_eq!(request.method, Method::Patch);
        assert!(request.url.ends_with("/auth/usuarios/2/rol"));
        assert_eq!(request.body, Some(json!({"rol": "operador"})));

        h.transport.reply(200, json!({"success": true}));
        auth.delete_user(&UserId::new("1")).await.expect("delete");
        let request = h.transport.last_request();
        assert_eq!(request.method, Method::Delete);
        assert!(request.url.ends_with("/auth/usuarios/1"));
    }

    #[tokio::test]
    async fn register_user_validates_then_posts() {
        let h = harness();
        let auth = authenticator(&h);
        let mut account = NewAccount {
            email: "nuevo@x.cl".to_string(),
            password: "123".to_string(),
            display_name: "Nuevo".to_string(),
            role: Role::Driver,
            phone: None,
            national_id: None,
        };
        assert!(auth.register_user(&account).await.is_err());
        assert!(h.transport.requests().is_empty());

        account.password = "secret1".to_string();
        h.transport.reply(
            201,
            json!({"success": true, "usuario": {"_id": "n1", "email": "nuevo@x.cl", "nombre": "Nuevo", "rol": "chofer"}}),
        );
        let created = auth.register_user(&account).await.expect("register");

        assert_eq!(created.id().as_str(), "n1");
        let body = h.transport.last_request().body.expect("body");
        assert_eq!(body["rol"], "chofer");
        assert_eq!(body["nombre"], "Nuevo");
    }

    #[test]
    fn restored_session_survives_new_authenticator() {
        let storage = Arc::new(MemoryStorage::new());
        let first = SessionStore::new(storage.clone());
        first.set(admin_session("persisted")).expect("set");

        let second = SessionStore::new(storage);
        second.restore();
        assert_eq!(second.token().as_deref(), Some("persisted"));
    }

    #[test]
    fn password_policy_counts_characters() {
        let policy = PasswordPolicy::new(6);
        assert!(policy.check("ñandú1").is_ok());
        assert!(policy.check("ñandú").is_err());
    }
}
