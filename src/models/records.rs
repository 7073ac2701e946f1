//! Failed-login aggregates returned by the workspace query.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Device name recorded when the log row carries none.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Failed-login count for one (source IP, device) pair within a query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFailureRecord {
    pub source_ip: String,
    pub device_name: String,
    pub failure_count: u64,
    pub window_end: DateTime<Utc>,
}

impl LoginFailureRecord {
    pub fn new(
        source_ip: impl Into<String>,
        device_name: impl Into<String>,
        failure_count: u64,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            source_ip: source_ip.into(),
            device_name: device_name.into(),
            failure_count,
            window_end,
        }
    }
}

/// Time range the aggregation query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// Window ending at `now` and reaching `hours` back.
    ///
    /// A span reaching past the earliest representable instant starts there.
    pub fn trailing(hours: u32, now: DateTime<Utc>) -> Self {
        let start = Duration::try_hours(i64::from(hours))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    /// ISO-8601 interval (`start/end`) as accepted by the query API.
    pub fn to_timespan(&self) -> String {
        format!(
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    pub fn hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

/// Records at or above the brute-force threshold, in query order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuspiciousSet {
    records: Vec<LoginFailureRecord>,
    threshold: u64,
}

impl SuspiciousSet {
    /// Build a set from records that already satisfy the threshold.
    pub(crate) fn new(records: Vec<LoginFailureRecord>, threshold: u64) -> Self {
        Self { records, threshold }
    }

    pub fn records(&self) -> &[LoginFailureRecord] {
        &self.records
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source IPs in first-seen order, each listed once.
    ///
    /// An IP that failed against several devices appears in several records.
    pub fn distinct_ips(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .map(|r| r.source_ip.as_str())
            .filter(|ip| seen.insert(*ip))
            .collect()
    }

    pub fn into_records(self) -> Vec<LoginFailureRecord> {
        self.records
    }
}
