//! Webhook alert payloads.

use serde::{Deserialize, Serialize};

use crate::models::records::{QueryWindow, SuspiciousSet};

/// Header line of every brute-force alert.
pub const ALERT_HEADER: &str = "🚨 Brute-force login alerts detected:";

/// Chat message posted to the webhook, serialized as `{"text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub text: String,
}

impl AlertMessage {
    /// One line per suspicious record under a fixed header.
    ///
    /// Returns `None` for an empty set; there is nothing to alert on.
    pub fn from_suspicious(set: &SuspiciousSet) -> Option<Self> {
        if set.is_empty() {
            return None;
        }

        let mut lines = Vec::with_capacity(set.len() + 1);
        lines.push(ALERT_HEADER.to_string());
        for record in set.records() {
            lines.push(format!(
                "{} failed logins from IP {} on {}",
                record.failure_count, record.source_ip, record.device_name
            ));
        }

        Some(Self {
            text: lines.join("\n"),
        })
    }

    /// Message sent for a quiet window when empty-run notifications are on.
    pub fn no_activity(window: &QueryWindow, threshold: u64) -> Self {
        Self {
            text: format!(
                "✅ No suspicious activity: no IP reached {threshold} failed logins in the past {}h.",
                window.hours()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::LoginFailureRecord;
    use chrono::Utc;

    #[test]
    fn test_alert_lines() {
        let now = Utc::now();
        let set = SuspiciousSet::new(
            vec![
                LoginFailureRecord::new("203.0.113.45", "VM-001", 72, now),
                LoginFailureRecord::new("203.0.113.77", "VM-002", 65, now),
            ],
            50,
        );

        let message = AlertMessage::from_suspicious(&set).unwrap();
        let lines: Vec<&str> = message.text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ALERT_HEADER);
        assert_eq!(lines[1], "72 failed logins from IP 203.0.113.45 on VM-001");
        assert_eq!(lines[2], "65 failed logins from IP 203.0.113.77 on VM-002");
    }

    #[test]
    fn test_no_alert_for_empty_set() {
        assert!(AlertMessage::from_suspicious(&SuspiciousSet::default()).is_none());
    }

    #[test]
    fn test_payload_shape() {
        let message = AlertMessage {
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hello" }));
    }

    #[test]
    fn test_no_activity_mentions_threshold_and_window() {
        let window = QueryWindow::trailing(24, Utc::now());
        let message = AlertMessage::no_activity(&window, 50);
        assert!(message.text.contains("50"));
        assert!(message.text.contains("24h"));
    }
}
