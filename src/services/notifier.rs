//! Webhook notifier for brute-force alerts.

use tracing::{debug, info};

use crate::error::DetectorError;
use crate::models::{AlertMessage, QueryWindow, SuspiciousSet};
use crate::services::http_client::HttpClient;
use crate::utils::redact_url_str;

/// What the notifier did with a suspicious set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// A message was delivered
    Sent,
    /// Nothing to send, or no webhook configured
    Skipped,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Sent => "sent",
            NotifyOutcome::Skipped => "skipped",
        }
    }
}

/// Posts alert summaries to a Slack-compatible webhook
pub struct WebhookNotifier {
    http: HttpClient,
    webhook_url: Option<String>,
    notify_on_empty: bool,
}

impl WebhookNotifier {
    pub fn new(http: HttpClient, webhook_url: Option<String>) -> Self {
        Self {
            http,
            webhook_url,
            notify_on_empty: false,
        }
    }

    /// Send a "no suspicious activity" message for empty sets
    pub fn with_notify_on_empty(mut self, enabled: bool) -> Self {
        self.notify_on_empty = enabled;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Deliver the alert for `set`.
    ///
    /// Without a webhook URL this makes no HTTP call and returns `Skipped`.
    pub async fn notify(
        &self,
        set: &SuspiciousSet,
        window: &QueryWindow,
    ) -> Result<NotifyOutcome, DetectorError> {
        let Some(url) = self.webhook_url.as_deref() else {
            debug!("No webhook configured; skipping notification");
            return Ok(NotifyOutcome::Skipped);
        };

        let message = match AlertMessage::from_suspicious(set) {
            Some(message) => message,
            None if self.notify_on_empty => AlertMessage::no_activity(window, set.threshold()),
            None => {
                debug!("No suspicious records; skipping notification");
                return Ok(NotifyOutcome::Skipped);
            }
        };

        let response = self
            .http
            .send(self.http.post(url).json(&message))
            .await
            .map_err(|e| DetectorError::Notification(e.user_message()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Notification(format!(
                "webhook returned HTTP {}: {}",
                status.as_u16(),
                excerpt(&body)
            )));
        }

        info!(
            webhook = %redact_url_str(url),
            records = set.len(),
            "Webhook alert sent"
        );
        Ok(NotifyOutcome::Sent)
    }
}

fn excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_CHARS {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    } else {
        trimmed.to_string()
    }
}
