//! Credential sources for the log query API.
//!
//! Sources are tried in a fixed order: service principal from the
//! environment, managed identity, then the Azure CLI. A source that is not
//! configured or not reachable is skipped; a source that answers with a
//! rejection stops the chain.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CredentialConfig;
use crate::error::DetectorError;
use crate::models::AccessToken;
use crate::services::http_client::HttpClient;

/// Errors a single credential source can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The source is not configured or not reachable; the next one may work
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The source answered and refused to issue a token
    #[error("{source_name} rejected the request: {reason}")]
    Rejected {
        source_name: &'static str,
        reason: String,
    },
}

impl From<CredentialError> for DetectorError {
    fn from(err: CredentialError) -> Self {
        DetectorError::Authentication(err.to_string())
    }
}

/// Anything that can hand out a bearer token for a scope
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Acquire a token for `scope` (for example `https://api.loganalytics.io/.default`)
    async fn acquire_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Resource identifier for sources that take a resource rather than a scope
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Client-credentials grant for a service principal
pub struct ClientSecretCredential {
    http: HttpClient,
    config: CredentialConfig,
}

impl ClientSecretCredential {
    const NAME: &'static str = "environment credential";

    pub fn new(config: CredentialConfig, http: HttpClient) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl CredentialProvider for ClientSecretCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            self.config.tenant_id.as_deref(),
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
        ) else {
            return Err(unavailable(
                Self::NAME,
                "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are not all set",
            ));
        };

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_host.trim_end_matches('/'),
            tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
        ];

        let response = self
            .http
            .send(self.http.post(&url).form(&form))
            .await
            .map_err(|e| rejected(Self::NAME, format!("token endpoint: {}", e.user_message())))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(rejected(
                Self::NAME,
                format!("HTTP {}: {}", status.as_u16(), oauth_error_description(&body)),
            ));
        }

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| rejected(Self::NAME, "token response has no access_token"))?;
        let expires_on = seconds_field(&body, "expires_in")
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

        Ok(AccessToken::new(token, expires_on))
    }
}

/// Managed identity via App Service's identity endpoint or the instance metadata service
pub struct ManagedIdentityCredential {
    http: HttpClient,
    config: CredentialConfig,
}

impl ManagedIdentityCredential {
    const NAME: &'static str = "managed identity";

    pub fn new(config: CredentialConfig, http: HttpClient) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl CredentialProvider for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);

        let request = match (&self.config.identity_endpoint, &self.config.identity_header) {
            (Some(endpoint), Some(header)) => self
                .http
                .get(endpoint)
                .query(&[("api-version", "2019-08-01"), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header),
            _ => self
                .http
                .get(&self.config.imds_endpoint)
                .query(&[("api-version", "2018-02-01"), ("resource", resource)])
                .header("Metadata", "true")
                .timeout(Duration::from_millis(self.config.imds_timeout_ms)),
        };

        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| unavailable(Self::NAME, e.user_message()))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        match status.as_u16() {
            200..=299 => {}
            // No identity assigned to this host
            400 | 404 => {
                return Err(unavailable(
                    Self::NAME,
                    format!("HTTP {}: {}", status.as_u16(), oauth_error_description(&body)),
                ));
            }
            code => {
                return Err(rejected(
                    Self::NAME,
                    format!("HTTP {code}: {}", oauth_error_description(&body)),
                ));
            }
        }

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| rejected(Self::NAME, "token response has no access_token"))?;
        let expires_on = seconds_field(&body, "expires_on")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

        Ok(AccessToken::new(token, expires_on))
    }
}

/// Token from a logged-in Azure CLI session
pub struct AzureCliCredential {
    enabled: bool,
    program: String,
    timeout: Duration,
}

impl AzureCliCredential {
    const NAME: &'static str = "Azure CLI";

    pub fn new(config: &CredentialConfig) -> Self {
        let program = if cfg!(windows) { "az.cmd" } else { "az" };
        Self {
            enabled: config.cli_enabled,
            program: program.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Use a different executable, mainly for tests
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl CredentialProvider for AzureCliCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        if !self.enabled {
            return Err(unavailable(Self::NAME, "disabled by configuration"));
        }

        let output = tokio::process::Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                scope_to_resource(scope),
                "--output",
                "json",
            ])
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Err(_) => return Err(unavailable(Self::NAME, "az did not answer in time")),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(unavailable(Self::NAME, "az is not installed"));
            }
            Ok(Err(e)) => return Err(unavailable(Self::NAME, format!("failed to run az: {e}"))),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("az login") {
                return Err(unavailable(Self::NAME, "not logged in; run 'az login'"));
            }
            return Err(rejected(Self::NAME, stderr));
        }

        parse_cli_token(&output.stdout).ok_or_else(|| rejected(Self::NAME, "unexpected az output"))
    }
}

fn parse_cli_token(stdout: &[u8]) -> Option<AccessToken> {
    let body: Value = serde_json::from_slice(stdout).ok()?;
    let token = body.get("accessToken")?.as_str()?;

    // Newer CLIs report a unix timestamp; older ones only a local wall-clock time
    let expires_on = seconds_field(&body, "expires_on")
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or_else(|| {
            let raw = body.get("expiresOn")?.as_str()?;
            let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
            Local
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

    Some(AccessToken::new(token, expires_on))
}

/// Tries each source in order until one issues a token
pub struct ChainedCredential {
    sources: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { sources }
    }

    /// Environment service principal, managed identity, then Azure CLI
    pub fn default_chain(config: &CredentialConfig, http: &HttpClient) -> Self {
        Self::new(vec![
            Box::new(ClientSecretCredential::new(config.clone(), http.clone())),
            Box::new(ManagedIdentityCredential::new(config.clone(), http.clone())),
            Box::new(AzureCliCredential::new(config)),
        ])
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredential {
    fn name(&self) -> &'static str {
        "credential chain"
    }

    async fn acquire_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.acquire_token(scope).await {
                Ok(token) => {
                    info!(source = source.name(), "Acquired access token");
                    return Ok(token);
                }
                Err(err @ CredentialError::Unavailable { .. }) => {
                    debug!(source = source.name(), reason = %err, "Credential source unavailable");
                    attempts.push(err.to_string());
                }
                Err(err @ CredentialError::Rejected { .. }) => {
                    warn!(source = source.name(), reason = %err, "Credential source rejected the request");
                    return Err(err);
                }
            }
        }

        Err(unavailable(
            self.name(),
            if attempts.is_empty() {
                "no credential sources configured".to_string()
            } else {
                attempts.join("; ")
            },
        ))
    }
}

fn unavailable(source_name: &'static str, reason: impl Into<String>) -> CredentialError {
    CredentialError::Unavailable {
        source_name,
        reason: reason.into(),
    }
}

fn rejected(source_name: &'static str, reason: impl Into<String>) -> CredentialError {
    CredentialError::Rejected {
        source_name,
        reason: reason.into(),
    }
}

/// `error_description` from an OAuth error body, or a placeholder
fn oauth_error_description(body: &Value) -> String {
    body.get("error_description")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(|s| s.lines().next().unwrap_or(s).to_string())
        .unwrap_or_else(|| "no error description".to_string())
}

/// Integer seconds that token endpoints send either as a number or a string
fn seconds_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
