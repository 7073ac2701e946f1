//! Placeholder IP blocking.
//!
//! Nothing here touches a firewall or the network. Each flagged IP gets a
//! log line and a [`BlockAction`] record so a real integration can slot in
//! later without changing the pipeline.

use tracing::info;

use crate::models::SuspiciousSet;

/// A simulated block of one source IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAction {
    pub ip: String,
}

impl BlockAction {
    pub fn log_line(&self) -> String {
        format!("[DEMO] Blocking IP: {}", self.ip)
    }
}

/// Emits one simulated block per distinct suspicious IP
#[derive(Debug, Default, Clone, Copy)]
pub struct RemediationStub;

impl RemediationStub {
    pub fn new() -> Self {
        Self
    }

    pub fn block_all(&self, set: &SuspiciousSet) -> Vec<BlockAction> {
        let actions: Vec<BlockAction> = set
            .distinct_ips()
            .into_iter()
            .map(|ip| BlockAction { ip: ip.to_string() })
            .collect();

        for action in &actions {
            info!(target: "remediation", ip = %action.ip, demo = true, "{}", action.log_line());
        }

        actions
    }
}
