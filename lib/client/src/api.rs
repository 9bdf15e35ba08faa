//! JSON client for the REST API.
//!
//! Wraps a [`Transport`] with the [`RequestAugmenter`], status
//! classification and body decoding. Services build on the typed helpers.

use rootcause::prelude::Report;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::augment::RequestAugmenter;
use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Client for the LonquiExpress REST API.
///
/// Cheap to clone; clones share the transport and augmenter.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
    augmenter: RequestAugmenter,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        base_url: impl AsRef<str>,
        transport: Arc<dyn Transport>,
        augmenter: RequestAugmenter,
    ) -> Self {
        Self {
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
            transport,
            augmenter,
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request through the augmenter and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns the classified failure for transport errors and non-success
    /// statuses.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Report<ApiError>> {
        Ok(self.exchange(request).await?)
    }

    /// # Errors
    ///
    /// Returns the classified failure, or `Decode` if the body does not fit `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Report<ApiError>> {
        Ok(self.call(Method::Get, path, None).await?)
    }

    /// # Errors
    ///
    /// Returns the classified failure, or `Decode` if the body does not fit `T`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Report<ApiError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Ok(self.call(Method::Post, path, Some(encode(body)?)).await?)
    }

    /// # Errors
    ///
    /// Returns the classified failure, or `Decode` if the body does not fit `T`.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Report<ApiError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Ok(self.call(Method::Put, path, Some(encode(body)?)).await?)
    }

    /// # Errors
    ///
    /// Returns the classified failure, or `Decode` if the body does not fit `T`.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, Report<ApiError>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Ok(self.call(Method::Patch, path, Some(encode(body)?)).await?)
    }

    /// # Errors
    ///
    /// Returns the classified failure, or `Decode` if the body does not fit `T`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Report<ApiError>> {
        Ok(self.call(Method::Delete, path, None).await?)
    }

    /// Typed call returning the unwrapped error, for callers that map it.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::new(method, self.url(path));
        request.body = body;
        let response = self.exchange(request).await?;
        response.json().map_err(|e| ApiError::Decode {
            reason: e.to_string(),
        })
    }

    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub(crate) async fn exchange(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.augmenter.before_send(&mut request);
        let method = request.method;
        let url = request.url.clone();

        let outcome = self.transport.execute(request).await;
        self.augmenter.after_response(method, &url, &outcome);

        let response = outcome?;
        if response.is_success() {
            debug!(status = response.status, "request succeeded");
            return Ok(response);
        }
        let path = url.strip_prefix(&*self.base_url).unwrap_or(&url);
        Err(ApiError::from_status(
            response.status,
            path,
            response.error_message(),
        ))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

pub(crate) fn encode<B: Serialize + ?Sized>(body: &B) -> Result<JsonValue, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode {
        reason: e.to_string(),
    })
}

/// Builds an API path from its segments and query pairs.
///
/// Each segment is percent-encoded, so a caller-supplied id cannot add
/// segments, start a query or cut the path short. Empty and dot segments are
/// rejected.
pub(crate) fn route(segments: &[&str], query: &[(&str, &str)]) -> Result<String, ApiError> {
    if let Some(bad) = segments
        .iter()
        .find(|segment| matches!(**segment, "" | "." | ".."))
    {
        return Err(ApiError::InvalidInput {
            field: "path",
            reason: format!("'{bad}' is not a valid path segment"),
        });
    }

    let mut url = reqwest::Url::parse("http://localhost/").map_err(|e| ApiError::Encode {
        reason: e.to_string(),
    })?;
    url.path_segments_mut()
        .map_err(|()| ApiError::Encode {
            reason: "url cannot carry a path".to_string(),
        })?
        .clear()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    Ok(match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    })
}
