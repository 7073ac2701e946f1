//! Command-line arguments and console output.

use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;

use crate::config::{DetectorConfig, LogConfig, LogFormat, MetricsConfig};
use crate::models::SuspiciousSet;

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
});

/// Detect brute-force login attempts in a Log Analytics workspace.
///
/// Every flag overrides the matching environment variable.
#[derive(Parser, Debug)]
#[command(name = "sentinel-bruteforce")]
#[command(version, long_version = LONG_VERSION.as_str(), about, long_about = None)]
pub struct Cli {
    /// Log Analytics workspace ID (AZURE_WORKSPACE_ID)
    #[arg(long)]
    pub workspace_id: Option<String>,

    /// Slack-compatible incoming webhook URL (SLACK_WEBHOOK_URL)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Minimum failed logins for an IP to be flagged (BRUTE_FORCE_THRESHOLD)
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Length of the trailing query window in hours (BRUTE_FORCE_WINDOW_HOURS)
    #[arg(long)]
    pub window_hours: Option<u32>,

    /// CSV report path (BRUTE_FORCE_REPORT_PATH)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Post a message even when nothing was flagged (BRUTE_FORCE_NOTIFY_ON_EMPTY)
    #[arg(long, default_value_t = false)]
    pub notify_on_empty: bool,

    /// Log output format: text or json (LOG_FORMAT)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Write Prometheus metrics to this file at exit (METRICS_TEXTFILE_PATH)
    #[arg(long)]
    pub metrics_textfile: Option<PathBuf>,
}

impl Cli {
    /// Layer the flags that were given over the environment configuration.
    pub fn apply(&self, detector: &mut DetectorConfig, log: &mut LogConfig, metrics: &mut MetricsConfig) {
        if let Some(workspace_id) = &self.workspace_id {
            detector.workspace_id = Some(workspace_id.clone());
        }
        if let Some(webhook_url) = &self.webhook_url {
            detector.webhook_url = Some(webhook_url.clone());
        }
        if let Some(threshold) = self.threshold {
            detector.threshold = threshold;
        }
        if let Some(window_hours) = self.window_hours {
            detector.window_hours = window_hours;
        }
        if let Some(output) = &self.output {
            detector.report_path = output.clone();
        }
        if self.notify_on_empty {
            detector.notify_on_empty = true;
        }
        if let Some(format) = self.log_format {
            log.format = format;
        }
        if let Some(path) = &self.metrics_textfile {
            metrics.textfile_path = Some(path.clone());
        }
    }
}

/// Fixed-width table of the flagged records for stdout.
pub fn format_table(set: &SuspiciousSet) -> String {
    let ip_width = set
        .records()
        .iter()
        .map(|r| r.source_ip.len())
        .chain(std::iter::once("RemoteIP".len()))
        .max()
        .unwrap_or(0);
    let device_width = set
        .records()
        .iter()
        .map(|r| r.device_name.len())
        .chain(std::iter::once("DeviceName".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{:<ip_width$}  {:<device_width$}  {}\n",
        "RemoteIP", "DeviceName", "BruteForceAttempts"
    );
    for record in set.records() {
        out.push_str(&format!(
            "{:<ip_width$}  {:<device_width$}  {}\n",
            record.source_ip, record.device_name, record.failure_count
        ));
    }
    out
}
