//! Shared HTTP client for the query API, token endpoints and the webhook.
//!
//! This module provides a thin wrapper over `reqwest` that adds:
//! - Connect and per-request timeouts
//! - Structured request logging with redacted URLs
//! - Request metrics keyed by destination host
//!
//! Requests are sent exactly once. Callers decide what a failed call means for
//! the run.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::services::metrics::RunMetrics;
use crate::utils::redact_url;

/// Configuration for the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Overall timeout for a request (in seconds)
    pub timeout_seconds: u64,

    /// Connection timeout (in seconds)
    pub connect_timeout_seconds: u64,

    /// Log every request at info level instead of debug
    pub enable_detailed_logging: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            connect_timeout_seconds: 10,
            enable_detailed_logging: true,
        }
    }
}

/// Request context for logging and metrics
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub destination: String,
    pub method: String,
    pub url: String,
}

/// HTTP client used by every outbound call of a run
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    metrics: Option<RunMetrics>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpClientConfig, metrics: Option<RunMetrics>) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HttpClientError::NetworkError)?;

        Ok(Self {
            client,
            config,
            metrics,
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a prepared request once, with logging, metrics and timeout handling
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, HttpClientError> {
        let request = builder.build().map_err(HttpClientError::InvalidRequest)?;

        let context = RequestContext {
            destination: extract_destination(request.url()),
            method: request.method().to_string(),
            url: redact_url(request.url()),
        };

        let timeout = request
            .timeout()
            .copied()
            .unwrap_or_else(|| Duration::from_secs(self.config.timeout_seconds));

        let start = Instant::now();
        let result = tokio::time::timeout(timeout, self.client.execute(request)).await;
        let duration = start.elapsed();

        match result {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                if self.config.enable_detailed_logging {
                    info!(
                        destination = %context.destination,
                        method = %context.method,
                        url = %context.url,
                        status,
                        duration_ms = duration.as_millis(),
                        "HTTP request completed"
                    );
                } else {
                    debug!(
                        destination = %context.destination,
                        method = %context.method,
                        status,
                        "HTTP request completed"
                    );
                }
                self.record_request_metrics(&context, status_outcome(status), duration);
                Ok(response)
            }
            Ok(Err(e)) => {
                let e = e.without_url();
                warn!(
                    destination = %context.destination,
                    method = %context.method,
                    url = %context.url,
                    error = %e,
                    duration_ms = duration.as_millis(),
                    "HTTP request failed with network error"
                );
                self.record_request_metrics(&context, "network_error", duration);
                Err(HttpClientError::NetworkError(e))
            }
            Err(_) => {
                warn!(
                    destination = %context.destination,
                    method = %context.method,
                    url = %context.url,
                    timeout_ms = timeout.as_millis(),
                    "HTTP request timed out"
                );
                self.record_request_metrics(&context, "timeout", duration);
                Err(HttpClientError::Timeout)
            }
        }
    }

    /// Record request metrics
    fn record_request_metrics(&self, context: &RequestContext, outcome: &str, duration: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_http_request(&context.destination, &context.method, outcome, duration);
        }
    }
}

/// Extract destination (host) from URL for metrics grouping
fn extract_destination(url: &url::Url) -> String {
    url.host_str().unwrap_or("unknown").to_string()
}

fn status_outcome(status: u16) -> &'static str {
    match status {
        200..=299 => "success",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "other",
    }
}

/// Errors that can occur when sending a request
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("Network error: {0}")]
    NetworkError(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(reqwest::Error),
}

impl HttpClientError {
    /// Short description suitable for console diagnostics
    pub fn user_message(&self) -> String {
        match self {
            HttpClientError::NetworkError(e) if e.is_connect() => {
                "could not connect to the remote service".to_string()
            }
            HttpClientError::NetworkError(_) => "network error while talking to the remote service".to_string(),
            HttpClientError::Timeout => "the remote service did not answer before the timeout".to_string(),
            HttpClientError::InvalidRequest(_) => "the request could not be built".to_string(),
        }
    }
}
