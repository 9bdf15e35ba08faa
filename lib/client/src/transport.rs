//! HTTP transport abstraction.
//!
//! Every backend call goes through a [`Transport`]. The production
//! implementation is [`ReqwestTransport`]; tests plug in a scripted one.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TransportError;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns a header value. Names compare case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a header, replacing any existing value of the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Sets a header only if it is absent.
    pub fn set_header_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if self.header(name).is_none() {
            self.headers.push((name.to_string(), value.into()));
        }
    }

    /// Returns all headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// A response with any HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON. An empty body parses as `null`.
    ///
    /// # Errors
    ///
    /// Returns the parser error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.trim().is_empty() {
            serde_json::from_value(JsonValue::Null)
        } else {
            serde_json::from_str(&self.body)
        }
    }

    /// Returns the `message` field of a JSON error body.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let value: JsonValue = serde_json::from_str(&self.body).ok()?;
        ["message", "mensaje", "error"]
            .into_iter()
            .find_map(|key| value.get(key).and_then(JsonValue::as_str))
            .map(ToString::to_string)
    }
}

/// Sends requests to the backend.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP status was received.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with an optional per-request timeout.
    ///
    /// The timeout is not supported on `wasm32`, where the browser applies
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        #[allow(unused_mut)]
        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;

        let client = builder.build().map_err(|e| TransportError::Unreachable {
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self { client })
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Unreachable {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let response = received(status, response.text().await);
        debug!(method = %request.method, url = %request.url, status, "response received");
        Ok(response)
    }
}

/// Pairs a received status with its body.
///
/// The status decides how the call is classified, so it is kept even when
/// the body cannot be read; the body is then empty.
fn received<E: fmt::Display>(status: u16, body: Result<String, E>) -> ApiResponse {
    match body {
        Ok(body) => ApiResponse { status, body },
        Err(err) => {
            warn!(status, error = %err, "failed to read response body");
            ApiResponse {
                status,
                body: String::new(),
            }
        }
    }
}
