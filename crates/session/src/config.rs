use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and timers for live sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Concurrent connections per user across all deals
    pub max_connections_per_user: usize,
    /// Idle time after which a connection is dropped
    pub inactivity_timeout_ms: u64,
    /// Period of the shared participant re-validation
    pub validation_interval_ms: u64,
    /// Chat messages allowed per user inside one window
    pub message_limit: usize,
    pub message_window_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: 5,
            inactivity_timeout_ms: 10 * 60 * 1000,
            validation_interval_ms: 10 * 60 * 1000,
            message_limit: 5,
            message_window_ms: 10 * 1000,
        }
    }
}

impl SessionConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    pub fn validation_interval(&self) -> Duration {
        Duration::from_millis(self.validation_interval_ms)
    }

    pub fn message_window(&self) -> Duration {
        Duration::from_millis(self.message_window_ms)
    }
}
