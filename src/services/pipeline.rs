//! One detection run: query, filter, report, notify, remediate.
//!
//! Stages run strictly in that order. A failing query or report write aborts
//! the run; a failing notification is logged and the run carries on.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::DetectorError;
use crate::models::{QueryWindow, SuspiciousSet};
use crate::services::log_query::LogQueryService;
use crate::services::metrics::RunMetrics;
use crate::services::notifier::{NotifyOutcome, WebhookNotifier};
use crate::services::remediation::{BlockAction, RemediationStub};
use crate::services::report::ReportWriter;
use crate::services::threshold::apply_threshold;

/// How the notification stage ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    Skipped,
    Failed(String),
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "sent",
            NotificationStatus::Skipped => "skipped",
            NotificationStatus::Failed(_) => "failed",
        }
    }
}

impl From<NotifyOutcome> for NotificationStatus {
    fn from(outcome: NotifyOutcome) -> Self {
        match outcome {
            NotifyOutcome::Sent => NotificationStatus::Sent,
            NotifyOutcome::Skipped => NotificationStatus::Skipped,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunSummary {
    pub window: QueryWindow,
    pub records_returned: usize,
    pub suspicious: SuspiciousSet,
    pub report_path: PathBuf,
    pub notification: NotificationStatus,
    pub actions: Vec<BlockAction>,
}

pub struct Pipeline {
    query: Box<dyn LogQueryService>,
    notifier: WebhookNotifier,
    report: ReportWriter,
    remediation: RemediationStub,
    threshold: u64,
    window_hours: u32,
    metrics: Option<RunMetrics>,
}

impl Pipeline {
    pub fn new(
        query: Box<dyn LogQueryService>,
        notifier: WebhookNotifier,
        report: ReportWriter,
        threshold: u64,
        window_hours: u32,
    ) -> Self {
        Self {
            query,
            notifier,
            report,
            remediation: RemediationStub::new(),
            threshold,
            window_hours,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: RunMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run every stage once over the window ending at `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, DetectorError> {
        let window = QueryWindow::trailing(self.window_hours, now);
        info!(
            threshold = self.threshold,
            window_hours = self.window_hours,
            timespan = %window.to_timespan(),
            "Starting brute-force detection run"
        );

        let started = Instant::now();
        let records = self.query.failed_logins(&window, self.threshold).await?;
        self.stage_done("query", started);
        let records_returned = records.len();

        let suspicious = apply_threshold(records, self.threshold);
        info!(
            returned = records_returned,
            suspicious = suspicious.len(),
            distinct_ips = suspicious.distinct_ips().len(),
            "Threshold applied"
        );
        if let Some(metrics) = &self.metrics {
            metrics.records_returned.set(records_returned as i64);
            metrics.suspicious_records.set(suspicious.len() as i64);
            metrics.suspicious_ips.set(suspicious.distinct_ips().len() as i64);
        }

        let started = Instant::now();
        let report_path = self.report.write(&suspicious)?;
        self.stage_done("report", started);

        let started = Instant::now();
        let notification = match self.notifier.notify(&suspicious, &window).await {
            Ok(outcome) => NotificationStatus::from(outcome),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Notification failed; continuing");
                NotificationStatus::Failed(e.to_string())
            }
            Err(e) => return Err(e),
        };
        self.stage_done("notify", started);
        if let Some(metrics) = &self.metrics {
            metrics.record_notification(notification.as_str());
        }

        let started = Instant::now();
        let actions = self.remediation.block_all(&suspicious);
        self.stage_done("remediate", started);

        if let Some(metrics) = &self.metrics {
            metrics.mark_success();
        }

        info!(
            suspicious = suspicious.len(),
            notification = notification.as_str(),
            blocked = actions.len(),
            "Detection run complete"
        );

        Ok(RunSummary {
            window,
            records_returned,
            suspicious,
            report_path,
            notification,
            actions,
        })
    }

    fn stage_done(&self, stage: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_stage(stage, started.elapsed());
        }
    }
}
