use dealroom_core::{ConnectionId, DealId};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::signal::SessionCallback;

struct ActivityRecord {
    deal_id: DealId,
    last_activity: Instant,
    /// Identifies the timer that currently owns this record
    generation: u64,
    timer: JoinHandle<()>,
    on_idle: Option<SessionCallback>,
}

type Records = Mutex<HashMap<ConnectionId, ActivityRecord>>;

/// Inactivity detection per connection
///
/// Every interaction re-arms a delayed check, so the check effectively
/// fires `timeout` after the most recent interaction.
pub struct ActivityTracker {
    timeout: Duration,
    records: Arc<Records>,
    generations: AtomicU64,
}

impl ActivityTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            records: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Start tracking a connection; `on_idle` runs once if it times out
    pub fn track(&self, connection_id: ConnectionId, deal_id: DealId, on_idle: SessionCallback) {
        let generation = self.next_generation();
        let timer = self.arm(connection_id, generation);
        let previous = self.records.lock().insert(
            connection_id,
            ActivityRecord {
                deal_id,
                last_activity: Instant::now(),
                generation,
                timer,
                on_idle: Some(on_idle),
            },
        );
        if let Some(previous) = previous {
            previous.timer.abort();
        }
    }

    /// Record an interaction and re-arm the check; false if not tracked
    pub fn refresh(&self, connection_id: ConnectionId) -> bool {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(&connection_id) else {
            return false;
        };
        record.timer.abort();
        record.last_activity = Instant::now();
        record.generation = self.next_generation();
        record.timer = self.arm(connection_id, record.generation);
        true
    }

    /// Stop tracking and cancel the pending check
    pub fn remove(&self, connection_id: ConnectionId) -> bool {
        match self.records.lock().remove(&connection_id) {
            Some(record) => {
                record.timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_tracked(&self, connection_id: ConnectionId) -> bool {
        self.records.lock().contains_key(&connection_id)
    }

    pub fn deal_of(&self, connection_id: ConnectionId) -> Option<DealId> {
        self.records.lock().get(&connection_id).map(|r| r.deal_id)
    }

    pub fn idle_for(&self, connection_id: ConnectionId) -> Option<Duration> {
        self.records
            .lock()
            .get(&connection_id)
            .map(|r| r.last_activity.elapsed())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn arm(&self, connection_id: ConnectionId, generation: u64) -> JoinHandle<()> {
        let records = Arc::downgrade(&self.records);
        let timeout = self.timeout;
        tokio::spawn(idle_check(records, connection_id, generation, timeout))
    }
}

async fn idle_check(
    records: Weak<Records>,
    connection_id: ConnectionId,
    generation: u64,
    timeout: Duration,
) {
    let mut deadline = Instant::now() + timeout;
    loop {
        tokio::time::sleep_until(deadline).await;
        let Some(records) = records.upgrade() else {
            return;
        };

        let expired = {
            let mut map = records.lock();
            let Some(record) = map.get(&connection_id) else {
                return;
            };
            if record.generation != generation {
                return;
            }
            let idle = record.last_activity.elapsed();
            if idle < timeout {
                deadline = record.last_activity + timeout;
                None
            } else {
                map.remove(&connection_id)
                    .map(|record| (record.deal_id, idle, record.on_idle))
            }
        };

        match expired {
            Some((deal_id, idle, on_idle)) => {
                info!(
                    "Connection idle connection_id={} deal_id={} idle_ms={}",
                    connection_id,
                    deal_id,
                    idle.as_millis()
                );
                if let Some(on_idle) = on_idle {
                    on_idle();
                }
                return;
            }
            None => debug!("Idle check re-armed connection_id={}", connection_id),
        }
    }
}
