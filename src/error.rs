//! Error taxonomy and exit codes for a detection run.

use std::path::PathBuf;

/// Exit codes for the detector binary.
pub mod codes {
    pub const SUCCESS: u8 = 0;
    pub const CONFIG_ERROR: u8 = 2;
    pub const AUTH_FAILED: u8 = 3;
    pub const QUERY_FAILED: u8 = 4;
    pub const REPORT_FAILED: u8 = 5;
}

/// Errors that can occur while running the detection pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("workspace query failed: {0}")]
    Query(String),

    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("webhook notification failed: {0}")]
    Notification(String),
}

impl DetectorError {
    /// Whether this error aborts the run.
    ///
    /// Notification failures are reported as warnings and never stop the
    /// remaining steps.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DetectorError::Notification(_))
    }
}

/// Map an error to its process exit code.
pub fn exit_code(err: &DetectorError) -> u8 {
    match err {
        DetectorError::Configuration(_) => codes::CONFIG_ERROR,
        DetectorError::Authentication(_) => codes::AUTH_FAILED,
        DetectorError::Query(_) => codes::QUERY_FAILED,
        DetectorError::Io { .. } => codes::REPORT_FAILED,
        DetectorError::Notification(_) => codes::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code(&DetectorError::Configuration("missing".into())),
            codes::CONFIG_ERROR
        );
        assert_eq!(
            exit_code(&DetectorError::Authentication("denied".into())),
            codes::AUTH_FAILED
        );
        assert_eq!(
            exit_code(&DetectorError::Query("timeout".into())),
            codes::QUERY_FAILED
        );
        assert_eq!(
            exit_code(&DetectorError::Io {
                path: PathBuf::from("/tmp/report.csv"),
                source: std::io::Error::other("disk full"),
            }),
            codes::REPORT_FAILED
        );
    }

    #[test]
    fn test_notification_is_not_fatal() {
        let err = DetectorError::Notification("HTTP 500".into());
        assert!(!err.is_fatal());
        assert_eq!(exit_code(&err), codes::SUCCESS);

        assert!(DetectorError::Query("boom".into()).is_fatal());
    }

    #[test]
    fn test_io_error_display_includes_path() {
        let err = DetectorError::Io {
            path: PathBuf::from("out/report.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = err.to_string();
        assert!(message.contains("out/report.csv"));
        assert!(message.contains("denied"));
    }
}
