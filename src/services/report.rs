//! CSV report of suspicious failed-login sources.
//!
//! Format:
//! RemoteIP,DeviceName,BruteForceAttempts

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::DetectorError;
use crate::models::SuspiciousSet;

/// Header row of the report.
pub const REPORT_HEADER: &str = "RemoteIP,DeviceName,BruteForceAttempts";

/// Writes the suspicious set to a CSV file
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the report file with the contents of `set`.
    ///
    /// The file is written next to its final location and renamed into place,
    /// so readers never see a half-written report.
    pub fn write(&self, set: &SuspiciousSet) -> Result<PathBuf, DetectorError> {
        let csv = generate_report_csv(set);
        write_atomic(&self.path, csv.as_bytes()).map_err(|source| DetectorError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            path = %self.path.display(),
            rows = set.len(),
            "Report written"
        );
        Ok(self.path.clone())
    }
}

/// Generate report CSV content; every line, the last included, ends in `\n`.
pub fn generate_report_csv(set: &SuspiciousSet) -> String {
    let mut out = String::with_capacity(64 * (set.len() + 1));
    out.push_str(REPORT_HEADER);
    out.push('\n');

    for record in set.records() {
        out.push_str(&escape_field(&record.source_ip));
        out.push(',');
        out.push_str(&escape_field(&record.device_name));
        out.push(',');
        out.push_str(&record.failure_count.to_string());
        out.push('\n');
    }

    out
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, data)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
