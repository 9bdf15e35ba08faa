//! Client configuration.
//!
//! Loaded via the `config` crate from `LONQUIEXPRESS_`-prefixed environment
//! variables. Nested keys use `__` as separator.

use lonquiexpress_platform_access::{FileStorage, KeyValueStorage, MemoryStorage};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LONQUIEXPRESS";

/// Configuration of the API client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Minimum password length accepted before contacting the server.
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    /// File holding the persisted session. In memory when unset.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    /// Per-request timeout. No timeout when unset.
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_password_min_length() -> usize {
    6
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            password_min_length: default_password_min_length(),
            storage_path: None,
            request_timeout_seconds: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        let source = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load {
                reason: e.to_string(),
            })?;
        Self::from_config(source)
    }

    /// Deserializes and validates an already-built configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or a value is invalid.
    pub fn from_config(source: config::Config) -> Result<Self, Report<ConfigError>> {
        let config: Self = source.try_deserialize().map_err(|e| ConfigError::Load {
            reason: e.to_string(),
        })?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, Report<ConfigError>> {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        self.api_base_url = trimmed.to_string();

        if self.password_min_length == 0 {
            return Err(ConfigError::Invalid {
                field: "password_min_length",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(self)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    /// Opens the session storage backend this configuration selects.
    #[must_use]
    pub fn open_storage(&self) -> Arc<dyn KeyValueStorage> {
        match &self.storage_path {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => Arc::new(MemoryStorage::new()),
        }
    }
}
