//! Credential source configuration.

use std::env;

use super::non_empty_var;

/// Default Microsoft Entra authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default instance metadata endpoint for managed identity tokens.
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Resource the log query API issues tokens for.
pub const LOG_ANALYTICS_RESOURCE: &str = "https://api.loganalytics.io";

/// Settings for every credential source in the fallback chain
#[derive(Clone, Default)]
pub struct CredentialConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authority_host: String,
    /// App Service style managed identity endpoint (`IDENTITY_ENDPOINT`)
    pub identity_endpoint: Option<String>,
    /// Shared secret sent with App Service identity requests (`IDENTITY_HEADER`)
    pub identity_header: Option<String>,
    pub imds_endpoint: String,
    /// Probe timeout for the metadata endpoint, which is unreachable off-Azure
    pub imds_timeout_ms: u64,
    /// Whether the Azure CLI fallback is tried at all
    pub cli_enabled: bool,
}

impl CredentialConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let imds_timeout_ms = env::var("AZURE_IMDS_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let cli_enabled = env::var("AZURE_CLI_CREDENTIAL_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            tenant_id: non_empty_var("AZURE_TENANT_ID"),
            client_id: non_empty_var("AZURE_CLIENT_ID"),
            client_secret: non_empty_var("AZURE_CLIENT_SECRET"),
            authority_host: non_empty_var("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            identity_endpoint: non_empty_var("IDENTITY_ENDPOINT"),
            identity_header: non_empty_var("IDENTITY_HEADER"),
            imds_endpoint: non_empty_var("AZURE_IMDS_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string()),
            imds_timeout_ms,
            cli_enabled,
        }
    }

    /// Whether a complete service principal is configured.
    pub fn has_client_secret(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("authority_host", &self.authority_host)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("identity_header", &self.identity_header.as_ref().map(|_| "<redacted>"))
            .field("imds_endpoint", &self.imds_endpoint)
            .field("imds_timeout_ms", &self.imds_timeout_ms)
            .field("cli_enabled", &self.cli_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_client_secret_requires_all_three() {
        let mut config = CredentialConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            ..Default::default()
        };
        assert!(!config.has_client_secret());

        config.client_secret = Some("s3cret".to_string());
        assert!(config.has_client_secret());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = CredentialConfig {
            client_secret: Some("s3cret".to_string()),
            identity_header: Some("hdr-value".to_string()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("hdr-value"));
    }

    #[test]
    fn test_from_env_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::remove_var("AZURE_AUTHORITY_HOST");
            env::remove_var("AZURE_IMDS_ENDPOINT");
            env::remove_var("AZURE_IMDS_TIMEOUT_MS");
            env::remove_var("AZURE_CLI_CREDENTIAL_ENABLED");
        }

        let config = CredentialConfig::from_env();
        assert_eq!(config.authority_host, DEFAULT_AUTHORITY_HOST);
        assert_eq!(config.imds_endpoint, DEFAULT_IMDS_ENDPOINT);
        assert_eq!(config.imds_timeout_ms, 1000);
        assert!(config.cli_enabled);
    }

    #[test]
    fn test_cli_can_be_disabled() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            env::set_var("AZURE_CLI_CREDENTIAL_ENABLED", "false");
        }

        assert!(!CredentialConfig::from_env().cli_enabled);

        unsafe {
            env::remove_var("AZURE_CLI_CREDENTIAL_ENABLED");
        }
    }
}
