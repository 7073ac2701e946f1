//! Metrics configuration.

use std::env;
use std::path::PathBuf;

/// Configuration for run metrics collection
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Where to write the Prometheus text exposition at the end of a run
    pub textfile_path: Option<PathBuf>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            textfile_path: None,
        }
    }
}

impl MetricsConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let enabled = env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let textfile_path = super::non_empty_var("METRICS_TEXTFILE_PATH").map(PathBuf::from);

        Self {
            enabled,
            textfile_path,
        }
    }
}
