use dealroom_core::{ConnectionId, DealId, UserId};
use dealroom_ports::ParticipantValidator;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::signal::SessionCallback;

type GroupKey = (DealId, UserId);

/// Shared validation timer for one user on one deal
struct ValidationGroup {
    generation: u64,
    validator: Arc<dyn ParticipantValidator>,
    interval: Duration,
    timer: JoinHandle<()>,
    /// Per-connection "became invalid" callbacks
    connections: HashMap<ConnectionId, SessionCallback>,
}

type Groups = Mutex<HashMap<GroupKey, ValidationGroup>>;

/// Periodic participant re-validation
///
/// One timer per (deal, user) pair no matter how many tabs the user has
/// open. When the validator says no (or fails), every registered connection
/// gets its callback exactly once and the whole group is torn down.
pub struct ValidationRegistry {
    groups: Arc<Groups>,
    generations: AtomicU64,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self {
            groups: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Add a connection to the pair's group, starting the shared timer if needed
    ///
    /// The latest validator wins. The timer is restarted only when the
    /// interval changes.
    pub fn register(
        &self,
        deal_id: DealId,
        user_id: UserId,
        connection_id: ConnectionId,
        validator: Arc<dyn ParticipantValidator>,
        interval: Duration,
        on_invalid: SessionCallback,
    ) {
        let key = (deal_id, user_id);
        let mut groups = self.groups.lock();

        if let Some(group) = groups.get_mut(&key) {
            group.connections.insert(connection_id, on_invalid);
            group.validator = validator;
            if group.interval != interval {
                group.timer.abort();
                group.generation = self.next_generation();
                group.interval = interval;
                group.timer = self.spawn_timer(key, group.generation, interval);
            }
            debug!(
                "Validation joined deal_id={} user_id={} connections={}",
                deal_id,
                user_id,
                group.connections.len()
            );
            return;
        }

        let generation = self.next_generation();
        let timer = self.spawn_timer(key, generation, interval);
        groups.insert(
            key,
            ValidationGroup {
                generation,
                validator,
                interval,
                timer,
                connections: HashMap::from([(connection_id, on_invalid)]),
            },
        );
        debug!(
            "Validation timer started deal_id={} user_id={} interval_ms={}",
            deal_id,
            user_id,
            interval.as_millis()
        );
    }

    /// Remove a connection; the last one out stops the timer
    pub fn unregister(&self, deal_id: DealId, user_id: UserId, connection_id: ConnectionId) -> bool {
        let key = (deal_id, user_id);
        let mut groups = self.groups.lock();
        let Some(group) = groups.get_mut(&key) else {
            return false;
        };
        let removed = group.connections.remove(&connection_id).is_some();
        if group.connections.is_empty() {
            if let Some(group) = groups.remove(&key) {
                group.timer.abort();
                debug!(
                    "Validation timer stopped deal_id={} user_id={}",
                    deal_id, user_id
                );
            }
        }
        removed
    }

    pub fn has_timer(&self, deal_id: DealId, user_id: UserId) -> bool {
        self.groups.lock().contains_key(&(deal_id, user_id))
    }

    pub fn connection_count(&self, deal_id: DealId, user_id: UserId) -> usize {
        self.groups
            .lock()
            .get(&(deal_id, user_id))
            .map_or(0, |group| group.connections.len())
    }

    pub fn timer_count(&self) -> usize {
        self.groups.lock().len()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn spawn_timer(&self, key: GroupKey, generation: u64, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(validation_loop(
            Arc::downgrade(&self.groups),
            key,
            generation,
            interval,
        ))
    }
}

impl Default for ValidationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn validation_loop(groups: Weak<Groups>, key: GroupKey, generation: u64, interval: Duration) {
    let (deal_id, user_id) = key;
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(groups) = groups.upgrade() else {
            return;
        };

        let validator = {
            let map = groups.lock();
            match map.get(&key) {
                Some(group) if group.generation == generation => Arc::clone(&group.validator),
                _ => return,
            }
        };

        let valid = match validator.validate(deal_id, user_id).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(
                    "Validation failed to run deal_id={} user_id={} error={}",
                    deal_id, user_id, e
                );
                false
            }
        };
        if valid {
            continue;
        }

        let connections = {
            let mut map = groups.lock();
            let current = map
                .get(&key)
                .is_some_and(|group| group.generation == generation);
            if !current {
                return;
            }
            map.remove(&key)
                .map(|group| group.connections)
                .unwrap_or_default()
        };

        info!(
            "Participant no longer valid deal_id={} user_id={} connections={}",
            deal_id,
            user_id,
            connections.len()
        );
        for (connection_id, on_invalid) in connections {
            if catch_unwind(AssertUnwindSafe(on_invalid)).is_err() {
                error!(
                    "Invalidation callback panicked connection_id={} deal_id={}",
                    connection_id, deal_id
                );
            }
        }
        return;
    }
}
