//! Failed-login aggregation against a Log Analytics workspace.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::DetectorError;
use crate::models::{LoginFailureRecord, QueryWindow, UNKNOWN_DEVICE};
use crate::services::credentials::CredentialProvider;
use crate::services::http_client::HttpClient;

/// Token scope for the Log Analytics query API.
pub const LOG_ANALYTICS_SCOPE: &str = "https://api.loganalytics.io/.default";

const IP_COLUMN: &str = "RemoteIP";
const DEVICE_COLUMN: &str = "DeviceName";
const COUNT_COLUMN: &str = "BruteForceAttempts";

/// Source of failed-login aggregates
#[async_trait]
pub trait LogQueryService: Send + Sync {
    /// Failed-login counts per (source IP, device) within `window`, at or above
    /// `threshold`, ordered by count descending
    async fn failed_logins(
        &self,
        window: &QueryWindow,
        threshold: u64,
    ) -> Result<Vec<LoginFailureRecord>, DetectorError>;
}

/// KQL that counts failed logons per source IP and device.
pub fn build_failed_login_query(window: &QueryWindow, threshold: u64) -> String {
    let start = window.start.to_rfc3339_opts(SecondsFormat::Secs, true);
    let end = window.end.to_rfc3339_opts(SecondsFormat::Secs, true);

    format!(
        "DeviceLogonEvents\n\
         | where ActionType == \"LogonFailed\"\n\
         | where isnotempty(RemoteIP)\n\
         | where TimeGenerated between (datetime({start}) .. datetime({end}))\n\
         | summarize {COUNT_COLUMN} = count() by {IP_COLUMN}, {DEVICE_COLUMN}\n\
         | where {COUNT_COLUMN} >= {threshold}\n\
         | order by {COUNT_COLUMN} desc, {IP_COLUMN} asc"
    )
}

/// REST client for the workspace query endpoint
pub struct LogAnalyticsClient {
    http: HttpClient,
    credential: Arc<dyn CredentialProvider>,
    endpoint: String,
    workspace_id: String,
}

impl LogAnalyticsClient {
    pub fn new(
        http: HttpClient,
        credential: Arc<dyn CredentialProvider>,
        endpoint: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            credential,
            endpoint: endpoint.into(),
            workspace_id: workspace_id.into(),
        }
    }

    fn query_url(&self) -> String {
        format!(
            "{}/v1/workspaces/{}/query",
            self.endpoint.trim_end_matches('/'),
            self.workspace_id
        )
    }
}

#[async_trait]
impl LogQueryService for LogAnalyticsClient {
    async fn failed_logins(
        &self,
        window: &QueryWindow,
        threshold: u64,
    ) -> Result<Vec<LoginFailureRecord>, DetectorError> {
        let token = self.credential.acquire_token(LOG_ANALYTICS_SCOPE).await?;

        let query = build_failed_login_query(window, threshold);
        debug!(query = %query, "Running failed-login query");

        let body = json!({
            "query": query,
            "timespan": window.to_timespan(),
        });

        let request = self
            .http
            .post(&self.query_url())
            .bearer_auth(token.secret())
            .json(&body);

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| DetectorError::Query(e.user_message()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DetectorError::Query(format!("failed to read response body: {e}")))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(DetectorError::Authentication(format!(
                "query API returned HTTP {}: {}",
                status.as_u16(),
                api_error_message(&text)
            )));
        }
        if !status.is_success() {
            return Err(DetectorError::Query(format!(
                "query API returned HTTP {}: {}",
                status.as_u16(),
                api_error_message(&text)
            )));
        }

        let parsed: QueryResponse = serde_json::from_str(&text)
            .map_err(|e| DetectorError::Query(format!("unexpected response body: {e}")))?;

        if let Some(error) = &parsed.error {
            warn!(
                code = error.code.as_deref().unwrap_or("unknown"),
                message = error.message.as_deref().unwrap_or(""),
                "Partial results returned; some tables failed"
            );
        }

        let records = records_from_response(parsed, window)?;
        info!(rows = records.len(), window_hours = window.hours(), "Workspace query completed");
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    tables: Vec<QueryTable>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryTable {
    #[serde(default)]
    columns: Vec<QueryColumn>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| match (e.error.code, e.error.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .unwrap_or_else(|| "no error details".to_string())
}

/// Convert the first result table into records.
///
/// Columns are looked up by name. Rows without a source IP are dropped; rows
/// without a device name get [`UNKNOWN_DEVICE`].
fn records_from_response(
    response: QueryResponse,
    window: &QueryWindow,
) -> Result<Vec<LoginFailureRecord>, DetectorError> {
    let Some(table) = response.tables.into_iter().next() else {
        info!("No results found");
        return Ok(Vec::new());
    };

    let column = |name: &str| {
        table
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DetectorError::Query(format!("result table has no '{name}' column")))
    };
    let ip_idx = column(IP_COLUMN)?;
    let device_idx = column(DEVICE_COLUMN)?;
    let count_idx = column(COUNT_COLUMN)?;

    let mut records = Vec::with_capacity(table.rows.len());
    for (row_number, row) in table.rows.iter().enumerate() {
        let Some(source_ip) = row.get(ip_idx).and_then(non_empty_str) else {
            warn!(row = row_number, "Skipping row without a source IP");
            continue;
        };

        let device_name = row
            .get(device_idx)
            .and_then(non_empty_str)
            .unwrap_or(UNKNOWN_DEVICE);

        let failure_count = row.get(count_idx).and_then(as_count).ok_or_else(|| {
            DetectorError::Query(format!(
                "row {row_number} has a non-integer {COUNT_COLUMN} value"
            ))
        })?;

        records.push(LoginFailureRecord::new(
            source_ip,
            device_name,
            failure_count,
            window.end,
        ));
    }

    Ok(records)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

// `long` columns arrive as JSON numbers, but some gateways stringify them
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
