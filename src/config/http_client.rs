//! Configuration for the shared HTTP client
//!
//! Provides environment-based configuration with defaults suited to a
//! single query and a single webhook call per run.

use std::env;
use crate::services::http_client::HttpClientConfig;

impl HttpClientConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout_seconds = env::var("HTTP_CLIENT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_seconds);

        let connect_timeout_seconds = env::var("HTTP_CLIENT_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.connect_timeout_seconds);

        let enable_detailed_logging = env::var("HTTP_CLIENT_DETAILED_LOGGING")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.enable_detailed_logging);

        Self {
            timeout_seconds,
            connect_timeout_seconds,
            enable_detailed_logging,
        }
    }
}
