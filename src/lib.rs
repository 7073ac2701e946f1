//! Sentinel Bruteforce - failed-login detection for a Log Analytics workspace
//!
//! A single run queries the workspace for failed logons over a trailing
//! window, flags source IPs at or above a threshold, and then:
//! - writes the flagged rows to a CSV report
//! - posts a summary to a Slack-compatible webhook
//! - logs a placeholder block action per flagged IP
//!
//! ## Architecture
//!
//! - `models/` - records, alert payloads and access tokens
//! - `services/` - credential chain, query client and the pipeline stages
//! - `config/` - environment configuration and validation
//! - `cli` - command-line overrides and console output
//! - `utils/` - tracing setup and URL redaction
//! - `error` - error taxonomy and exit codes
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sentinel_bruteforce::{
//!     ChainedCredential, CredentialConfig, DetectorConfig, HttpClient, HttpClientConfig,
//!     LogAnalyticsClient, Pipeline, ReportWriter, WebhookNotifier,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DetectorConfig::from_env();
//! config.validate()?;
//!
//! let http = HttpClient::new(HttpClientConfig::from_env(), None)?;
//! let credential = ChainedCredential::default_chain(&CredentialConfig::from_env(), &http);
//! let query = LogAnalyticsClient::new(
//!     http.clone(),
//!     Arc::new(credential),
//!     config.query_endpoint.clone(),
//!     config.workspace_id()?,
//! );
//!
//! let pipeline = Pipeline::new(
//!     Box::new(query),
//!     WebhookNotifier::new(http, config.webhook_url.clone()),
//!     ReportWriter::new(&config.report_path),
//!     config.threshold,
//!     config.window_hours,
//! );
//! let summary = pipeline.run(chrono::Utc::now()).await?;
//! println!("{} suspicious records", summary.suspicious.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{
    CredentialConfig, DetectorConfig, LogConfig, LogFormat, MetricsConfig,
};
pub use error::{DetectorError, codes, exit_code};
pub use models::{AccessToken, AlertMessage, LoginFailureRecord, QueryWindow, SuspiciousSet};
pub use services::{
    AzureCliCredential, BlockAction, ChainedCredential, ClientSecretCredential, CredentialError,
    CredentialProvider, HttpClient, HttpClientConfig, HttpClientError, LogAnalyticsClient,
    LogQueryService, ManagedIdentityCredential, NotificationStatus, NotifyOutcome, Pipeline,
    RemediationStub, ReportWriter, RunMetrics, RunSummary, WebhookNotifier, apply_threshold,
};
