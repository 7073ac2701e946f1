//! Run metrics and Prometheus text export.
//!
//! A detection run is a batch job, so nothing scrapes it. The registry is
//! rendered once at the end of the run and optionally written to a textfile
//! for node_exporter's textfile collector.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::path::Path;
use std::time::Duration;

/// Metrics collected over one detection run
#[derive(Clone)]
pub struct RunMetrics {
    pub registry: Registry,
    pub records_returned: IntGauge,
    pub suspicious_records: IntGauge,
    pub suspicious_ips: IntGauge,
    pub notifications_total: CounterVec,
    pub stage_duration_seconds: HistogramVec,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub last_success_timestamp_seconds: Gauge,
    pub build_info: GaugeVec,
}

impl RunMetrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let records_returned = IntGauge::new(
            "bruteforce_query_records",
            "Rows returned by the failed-login aggregation query",
        )?;

        let suspicious_records = IntGauge::new(
            "bruteforce_suspicious_records",
            "Records at or above the brute-force threshold",
        )?;

        let suspicious_ips = IntGauge::new(
            "bruteforce_suspicious_ips",
            "Distinct source IPs at or above the brute-force threshold",
        )?;

        let notifications_total = CounterVec::new(
            Opts::new("bruteforce_notifications_total", "Webhook notifications by outcome"),
            &["outcome"],
        )?;

        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bruteforce_stage_duration_seconds",
                "Duration of each pipeline stage in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["stage"],
        )?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "bruteforce_http_requests_total",
                "Outbound HTTP requests by destination, method, and outcome",
            ),
            &["destination", "method", "outcome"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bruteforce_http_request_duration_seconds",
                "Duration of outbound HTTP requests",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["destination", "method"],
        )?;

        let last_success_timestamp_seconds = Gauge::new(
            "bruteforce_last_success_timestamp_seconds",
            "Unix time the last run completed without a fatal error",
        )?;

        let build_info = GaugeVec::new(
            Opts::new("bruteforce_build_info", "Build information"),
            &["version", "commit"],
        )?;

        // Register all metrics
        registry.register(Box::new(records_returned.clone()))?;
        registry.register(Box::new(suspicious_records.clone()))?;
        registry.register(Box::new(suspicious_ips.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;
        registry.register(Box::new(build_info.clone()))?;

        build_info
            .with_label_values(&[
                env!("CARGO_PKG_VERSION"),
                option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            ])
            .set(1.0);

        Ok(Self {
            registry,
            records_returned,
            suspicious_records,
            suspicious_ips,
            notifications_total,
            stage_duration_seconds,
            http_requests_total,
            http_request_duration_seconds,
            last_success_timestamp_seconds,
            build_info,
        })
    }

    /// Record an outbound HTTP request
    pub fn record_http_request(&self, destination: &str, method: &str, outcome: &str, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[destination, method, outcome])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[destination, method])
            .observe(duration.as_secs_f64());
    }

    /// Record how long a pipeline stage took
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        self.stage_duration_seconds
            .with_label_values(&[stage])
            .observe(duration.as_secs_f64());
    }

    pub fn record_notification(&self, outcome: &str) {
        self.notifications_total.with_label_values(&[outcome]).inc();
    }

    pub fn mark_success(&self) {
        self.last_success_timestamp_seconds
            .set(chrono::Utc::now().timestamp() as f64);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families)
    }

    /// Write the rendered metrics to `path`, replacing any previous run's file
    pub fn write_textfile(&self, path: &Path) -> std::io::Result<()> {
        let body = self.render().map_err(std::io::Error::other)?;
        // node_exporter ignores files that don't end in .prom, so the temp name is safe
        let temp_path = path.with_extension("prom.tmp");
        std::fs::write(&temp_path, body)?;
        std::fs::rename(&temp_path, path)
    }
}
