//! Request scopes: cancel in-flight calls when their owner goes away.
//!
//! A view creates a [`RequestScope`] and runs its backend calls through it.
//! Dropping the scope, or calling [`RequestScope::cancel`], aborts every
//! call still pending. An aborted call resolves to [`ApiError::Cancelled`]
//! and produces no side effects after that point.

use futures::future::{AbortHandle, Abortable, Aborted};
use rootcause::prelude::Report;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Default)]
struct ScopeState {
    cancelled: bool,
    next_id: u64,
    handles: HashMap<u64, AbortHandle>,
}

/// Owner of a group of in-flight requests.
#[derive(Debug, Default)]
pub struct RequestScope {
    state: Arc<Mutex<ScopeState>>,
}

impl RequestScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties `call` to this scope.
    ///
    /// The returned future does not borrow the scope; it resolves to
    /// `Cancelled` if the scope is cancelled or dropped first.
    pub fn run<T, F>(&self, call: F) -> impl Future<Output = Result<T, Report<ApiError>>> + use<T, F>
    where
        F: Future<Output = Result<T, Report<ApiError>>>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let id = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.cancelled {
                handle.abort();
                None
            } else {
                let id = state.next_id;
                state.next_id += 1;
                state.handles.insert(id, handle);
                Some(id)
            }
        };

        let entry = ScopeEntry {
            state: Arc::clone(&self.state),
            id,
        };
        let call = Abortable::new(call, registration);
        async move {
            let outcome = call.await;
            drop(entry);
            match outcome {
                Ok(result) => result,
                Err(Aborted) => Err(ApiError::Cancelled.into()),
            }
        }
    }

    /// Aborts every pending call and refuses new ones.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.cancelled {
            debug!(pending = state.handles.len(), "request scope cancelled");
        }
        state.cancelled = true;
        for (_, handle) in state.handles.drain() {
            handle.abort();
        }
    }

    /// Number of calls started through this scope that have not finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handles
            .len()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancelled
    }
}

/// Forgets a call's abort handle once the call finishes or is dropped.
struct ScopeEntry {
    state: Arc<Mutex<ScopeState>>,
    id: Option<u64>,
}

impl Drop for ScopeEntry {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handles
                .remove(&id);
        }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.cancel();
    }
}
