//! Brute-force threshold filter.

use crate::models::{LoginFailureRecord, SuspiciousSet};

/// Keep records whose failure count is at least `threshold`, in their original order.
pub fn apply_threshold(records: Vec<LoginFailureRecord>, threshold: u64) -> SuspiciousSet {
    let suspicious = records
        .into_iter()
        .filter(|r| r.failure_count >= threshold)
        .collect();
    SuspiciousSet::new(suspicious, threshold)
}
