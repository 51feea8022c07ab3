use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cadence of the three reconciliation jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Flush of dirty entries
    pub sync_interval_ms: u64,
    /// Sweep of stale entries
    pub eviction_interval_ms: u64,
    /// Sweep of deals past their auto-cancel deadline
    pub expiry_interval_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 10 * 1000,
            eviction_interval_ms: 10 * 1000,
            expiry_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl ReconcilerConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms.max(1))
    }

    pub fn expiry_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_interval_ms.max(1))
    }
}
