use chrono::{Duration, Utc};
use dealroom_core::Timestamp;
use dealroom_ports::Clock;
use parking_lot::RwLock;
use std::sync::Arc;

/// Clock that only moves when told to
///
/// Used by tests that exercise idle thresholds and expiry deadlines
/// without waiting on real time.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start` (or at the current wall time)
    pub fn new(start: Option<Timestamp>) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(start.unwrap_or_else(Utc::now)),
        })
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        *self.current.write() += duration;
    }

    /// Jump to an explicit time
    pub fn set(&self, time: Timestamp) {
        *self.current.write() = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}
