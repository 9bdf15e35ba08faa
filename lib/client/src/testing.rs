//! Test fixtures: a scripted transport and a wired-up client.

use async_trait::async_trait;
use lonquiexpress_core::UserId;
use lonquiexpress_platform_access::{
    MemoryNavigator, MemoryStorage, RecordingNotifier, Role, Session, SessionStore, UserProfile,
    View,
};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::ApiClient;
use crate::augment::RequestAugmenter;
use crate::error::TransportError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub(crate) const BASE_URL: &str = "http://localhost:3000/api";

/// Transport answering from a queue and recording every request.
#[derive(Default)]
pub(crate) struct FakeTransport {
    replies: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn reply(&self, status: u16, body: JsonValue) {
        self.push(Ok(ApiResponse::new(status, body.to_string())));
    }

    pub(crate) fn fail(&self, err: TransportError) {
        self.push(Err(err));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("a request was sent")
    }

    fn push(&self, reply: Result<ApiResponse, TransportError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Unreachable {
                    reason: "no reply scripted".to_string(),
                })
            })
    }
}

pub(crate) struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub store: Arc<SessionStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub transport: Arc<FakeTransport>,
    pub augmenter: RequestAugmenter,
    pub api: ApiClient,
}

pub(crate) fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();

    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::new(storage.clone()));
    let navigator = Arc::new(MemoryNavigator::new(View::Login));
    let notifier = Arc::new(RecordingNotifier::new());
    let transport = Arc::new(FakeTransport::default());
    let augmenter = RequestAugmenter::new(
        store.clone(),
        navigator.clone(),
        notifier.clone(),
        BASE_URL,
    );
    let api = ApiClient::new(BASE_URL, transport.clone(), augmenter.clone());
    Harness {
        storage,
        store,
        navigator,
        notifier,
        transport,
        augmenter,
        api,
    }
}

pub(crate) fn profile(role: Role) -> UserProfile {
    UserProfile::new(UserId::new("u-1"), "admin@x.cl", "Ana", Some(role))
}

pub(crate) fn admin_session(token: &str) -> Session {
    Session::new(token, profile(Role::Admin)).expect("session")
}
