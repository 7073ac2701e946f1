//! Detection run configuration.

use std::env;
use std::path::PathBuf;

use super::non_empty_var;
use crate::error::DetectorError;

/// Default minimum number of failures that marks an IP as suspicious.
pub const DEFAULT_THRESHOLD: u64 = 50;

/// Longest accepted query window: one hundred years.
pub const MAX_WINDOW_HOURS: u32 = 24 * 365 * 100;

/// Default observation window in hours.
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Default report file name.
pub const DEFAULT_REPORT_PATH: &str = "suspicious_failed_logins.csv";

/// Default Log Analytics query endpoint.
pub const DEFAULT_QUERY_ENDPOINT: &str = "https://api.loganalytics.io";

/// Settings for one detection run
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub workspace_id: Option<String>,
    pub webhook_url: Option<String>,
    pub threshold: u64,
    pub window_hours: u32,
    pub report_path: PathBuf,
    pub notify_on_empty: bool,
    pub query_endpoint: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            workspace_id: None,
            webhook_url: None,
            threshold: DEFAULT_THRESHOLD,
            window_hours: DEFAULT_WINDOW_HOURS,
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            notify_on_empty: false,
            query_endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let workspace_id = non_empty_var("AZURE_WORKSPACE_ID");
        let webhook_url = non_empty_var("SLACK_WEBHOOK_URL");

        let threshold = env::var("BRUTE_FORCE_THRESHOLD")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_THRESHOLD);

        let window_hours = env::var("BRUTE_FORCE_WINDOW_HOURS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_WINDOW_HOURS);

        let report_path = non_empty_var("BRUTE_FORCE_REPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH));

        let notify_on_empty = env::var("BRUTE_FORCE_NOTIFY_ON_EMPTY")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let query_endpoint = non_empty_var("LOG_ANALYTICS_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_QUERY_ENDPOINT.to_string());

        Self {
            workspace_id,
            webhook_url,
            threshold,
            window_hours,
            report_path,
            notify_on_empty,
            query_endpoint,
        }
    }

    /// The workspace to query, or a configuration error when none is set.
    pub fn workspace_id(&self) -> Result<&str, DetectorError> {
        self.workspace_id.as_deref().ok_or_else(|| {
            DetectorError::Configuration(
                "AZURE_WORKSPACE_ID is not set; pass --workspace-id or set the environment variable"
                    .to_string(),
            )
        })
    }

    /// Check every setting that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<(), DetectorError> {
        let workspace_id = self.workspace_id()?;
        if uuid::Uuid::parse_str(workspace_id).is_err() {
            return Err(DetectorError::Configuration(format!(
                "workspace id '{workspace_id}' is not a GUID"
            )));
        }

        if self.window_hours == 0 {
            return Err(DetectorError::Configuration(
                "observation window must be at least 1 hour".to_string(),
            ));
        }
        if self.window_hours > MAX_WINDOW_HOURS {
            return Err(DetectorError::Configuration(format!(
                "observation window of {} hours exceeds the maximum of {MAX_WINDOW_HOURS}",
                self.window_hours
            )));
        }

        // The query compares against a KQL `long`
        if i64::try_from(self.threshold).is_err() {
            return Err(DetectorError::Configuration(format!(
                "threshold {} exceeds the largest supported value {}",
                self.threshold,
                i64::MAX
            )));
        }

        if let Some(webhook) = &self.webhook_url {
            check_http_url("webhook URL", webhook)?;
        }
        check_http_url("query endpoint", &self.query_endpoint)?;

        if self.report_path.as_os_str().is_empty() {
            return Err(DetectorError::Configuration(
                "report path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Only the scheme is echoed back; webhook URLs embed their secret in the path.
fn check_http_url(label: &str, raw: &str) -> Result<(), DetectorError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| DetectorError::Configuration(format!("{label} is not a valid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DetectorError::Configuration(format!(
            "{label} must use http or https, got '{other}'"
        ))),
    }
}
