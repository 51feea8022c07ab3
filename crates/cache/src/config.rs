use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle time after which an entry is handed to the eviction sweep
    pub stale_after_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: 5 * 60 * 1000,
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.stale_after_ms).unwrap_or(i64::MAX))
    }
}
