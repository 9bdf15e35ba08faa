//! Application wiring.
//!
//! [`ClientContext`] builds the session store, authorizer, authenticator
//! and services from one configuration and one set of host seams, so every
//! component shares the same session.

use lonquiexpress_platform_access::{
    KeyValueStorage, LogNotifier, MemoryNavigator, Navigator, Notifier, RestoreOutcome,
    RouteAuthorizer, RouteTable, SessionStore, View,
};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::info;

use crate::api::ApiClient;
use crate::augment::RequestAugmenter;
use crate::auth::{Authenticator, PasswordPolicy};
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::parcels::ParcelService;
use crate::tracking::TrackingService;
use crate::transport::{ReqwestTransport, Transport};

/// Host-provided seams.
pub struct Host {
    pub storage: Arc<dyn KeyValueStorage>,
    pub transport: Arc<dyn Transport>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

impl Host {
    /// Headless host: storage and HTTP transport from `config`, navigation
    /// held in memory, notices written to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Report<TransportError>> {
        Ok(Self {
            storage: config.open_storage(),
            transport: Arc::new(ReqwestTransport::new(config.request_timeout())?),
            navigator: Arc::new(MemoryNavigator::new(View::Login)),
            notifier: Arc::new(LogNotifier),
        })
    }
}

/// Every client component, sharing one session store.
pub struct ClientContext {
    pub store: Arc<SessionStore>,
    pub authorizer: RouteAuthorizer,
    pub authenticator: Authenticator,
    pub api: ApiClient,
    pub parcels: ParcelService,
    pub tracking: TrackingService,
}

impl ClientContext {
    /// Wires the components and restores any persisted session.
    #[must_use]
    pub fn new(config: &ClientConfig, host: Host) -> Self {
        let store = Arc::new(SessionStore::new(host.storage));
        let restored = store.restore();
        info!(
            api_base_url = %config.api_base_url,
            restored = restored == RestoreOutcome::Restored,
            "client initialized"
        );

        let augmenter = RequestAugmenter::new(
            store.clone(),
            host.navigator.clone(),
            host.notifier.clone(),
            config.api_base_url.clone(),
        );
        let api = ApiClient::new(&config.api_base_url, host.transport, augmenter);
        let authenticator = Authenticator::new(
            api.clone(),
            store.clone(),
            host.navigator.clone(),
            PasswordPolicy::new(config.password_min_length),
        );
        let authorizer = RouteAuthorizer::new(
            store.clone(),
            RouteTable::default(),
            host.navigator,
            host.notifier,
        );

        Self {
            parcels: ParcelService::new(api.clone()),
            tracking: TrackingService::new(api.clone()),
            store,
            authorizer,
            authenticator,
            api,
        }
    }
}
