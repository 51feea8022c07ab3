use chrono::Duration;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dealroom_core::{Deal, DealId, UserId};
use dealroom_ports::{Clock, DealStore};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::CacheConfig;
use crate::entry::{CacheEntry, DirtyDeal, EntryStatus, StaleEntry};
use crate::error::{CacheError, CacheResult};

type Slot = Arc<Mutex<CacheEntry>>;

/// Write-back cache of deal aggregates
///
/// Mutations land in memory and become visible to every reader at once;
/// the reconciler persists dirty entries on its own cadence.
///
/// Locking:
/// - each entry sits behind its own mutex (single writer per deal)
/// - entry mutexes are never held across an `.await`
/// - scans clone the slot handles out of the map before locking any entry
/// - loads are single-flight per deal through an async gate
///
/// Presence is kept beside the entries, not in them, so a deal evicted
/// while its users are still connected comes back with them online.
pub struct WriteBackCache {
    entries: DashMap<DealId, Slot>,
    presence: DashMap<DealId, HashSet<UserId>>,
    loading: DashMap<DealId, Arc<AsyncMutex<()>>>,
    store: Arc<dyn DealStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl WriteBackCache {
    pub fn new(store: Arc<dyn DealStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(store, clock, CacheConfig::default())
    }

    pub fn with_config(store: Arc<dyn DealStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            presence: DashMap::new(),
            loading: DashMap::new(),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached deal, loading it from the store on a miss
    pub async fn get(&self, id: DealId) -> CacheResult<Deal> {
        let slot = self.slot(id).await?;
        let mut entry = slot.lock();
        entry.last_activity = self.clock.now();
        Ok(entry.deal.clone())
    }

    /// Run `f` against the deal under its exclusive lock
    ///
    /// On `Ok` the entry is marked dirty and its activity refreshed.
    /// On `Err` the entry is left as it was; `f` must not write before it fails.
    pub async fn mutate<T, E, F>(&self, id: DealId, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Deal) -> Result<T, E>,
        E: From<CacheError>,
    {
        self.mutate_with(id, |deal| f(deal).map(|value| (value, true)))
            .await
    }

    /// Like [`WriteBackCache::mutate`], but `f` reports whether it changed
    /// anything; an unchanged deal only has its activity refreshed.
    pub async fn mutate_with<T, E, F>(&self, id: DealId, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Deal) -> Result<(T, bool), E>,
        E: From<CacheError>,
    {
        loop {
            let slot = self.slot(id).await.map_err(E::from)?;
            let mut entry = slot.lock();
            if entry.evicted {
                // Lost a race with eviction; reload from the store
                drop(entry);
                continue;
            }

            let now = self.clock.now();
            let (value, changed) = f(&mut entry.deal)?;
            if changed {
                entry.mark_dirty(now);
            } else {
                entry.last_activity = now;
            }
            return Ok(value);
        }
    }

    /// Upsert a deal, marking it dirty unless it was already persisted
    pub fn set(&self, deal: Deal, mark_dirty: bool) {
        let now = self.clock.now();
        let slot = match self.entries.entry(deal.id) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(CacheEntry::new(deal, now, mark_dirty))));
                return;
            }
        };

        let mut entry = slot.lock();
        entry.deal = deal;
        entry.last_activity = now;
        if mark_dirty {
            entry.mark_dirty(now);
        }
    }

    /// Refresh activity without changing dirtiness; false if not cached
    pub fn touch(&self, id: DealId) -> bool {
        match self.lookup(id) {
            Some(slot) => {
                slot.lock().last_activity = self.clock.now();
                true
            }
            None => false,
        }
    }

    /// Snapshot of every dirty entry
    pub fn changed(&self) -> Vec<DirtyDeal> {
        self.slots()
            .iter()
            .filter_map(|slot| {
                let entry = slot.lock();
                entry.dirty.then(|| DirtyDeal {
                    deal: entry.deal.clone(),
                    revision: entry.revision,
                })
            })
            .collect()
    }

    /// Record a successful flush of `revision`
    ///
    /// Returns false when the entry changed again after the snapshot was
    /// taken; it then stays dirty for the next tick.
    pub fn mark_synced(&self, id: DealId, revision: u64) -> bool {
        let Some(slot) = self.lookup(id) else {
            return false;
        };
        let mut entry = slot.lock();
        entry.last_synced = self.clock.now();
        if entry.revision == revision {
            entry.dirty = false;
            true
        } else {
            debug!(
                "Deal changed during flush deal_id={} flushed={} current={}",
                id, revision, entry.revision
            );
            false
        }
    }

    /// Entries idle for at least `max_idle` or with nobody online
    pub fn stale_entries(&self, max_idle: Duration) -> Vec<StaleEntry> {
        let now = self.clock.now();
        self.slots()
            .iter()
            .filter_map(|slot| {
                let entry = slot.lock();
                let online = self.online_users(entry.deal.id);
                let idle = now - entry.last_activity >= max_idle;
                (idle || online.is_empty()).then(|| StaleEntry {
                    deal: entry.deal.clone(),
                    dirty: entry.dirty,
                    revision: entry.revision,
                    last_activity: entry.last_activity,
                    online_user_ids: online,
                })
            })
            .collect()
    }

    /// Drop an entry unconditionally, returning the deal it held
    pub fn remove(&self, id: DealId) -> Option<Deal> {
        self.evict_where(id, |_| true)
    }

    /// Drop an entry unless it was mutated after `revision` was captured
    pub fn evict(&self, id: DealId, revision: u64) -> bool {
        self.evict_where(id, |entry| entry.revision == revision).is_some()
    }

    /// Mark a user online for a deal; false if the deal is not cached
    ///
    /// Presence is recorded either way and survives eviction.
    pub fn register_online(&self, id: DealId, user_id: UserId) -> bool {
        self.presence.entry(id).or_default().insert(user_id);
        self.touch(id)
    }

    pub fn unregister_online(&self, id: DealId, user_id: UserId) -> bool {
        if let Some(mut online) = self.presence.get_mut(&id) {
            online.remove(&user_id);
        }
        self.presence.remove_if(&id, |_, online| online.is_empty());
        self.touch(id)
    }

    pub fn online_users(&self, id: DealId) -> Vec<UserId> {
        self.presence
            .get(&id)
            .map(|online| online.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Cached deal without refreshing activity or loading
    pub fn peek(&self, id: DealId) -> Option<Deal> {
        self.lookup(id).map(|slot| slot.lock().deal.clone())
    }

    pub fn status(&self, id: DealId) -> Option<EntryStatus> {
        let slot = self.lookup(id)?;
        let entry = slot.lock();
        Some(EntryStatus::new(&entry, self.online_users(id)))
    }

    pub fn contains(&self, id: DealId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, id: DealId) -> Option<Slot> {
        self.entries.get(&id).map(|slot| Arc::clone(slot.value()))
    }

    fn slots(&self) -> Vec<Slot> {
        self.entries
            .iter()
            .map(|slot| Arc::clone(slot.value()))
            .collect()
    }

    fn evict_where(&self, id: DealId, allow: impl FnOnce(&CacheEntry) -> bool) -> Option<Deal> {
        let slot = self.lookup(id)?;
        let mut entry = slot.lock();
        if entry.evicted || !allow(&entry) {
            return None;
        }
        // Flag first so a writer queued on this lock reloads instead of
        // mutating an orphaned entry.
        entry.evicted = true;
        self.entries
            .remove_if(&id, |_, current| Arc::ptr_eq(current, &slot));
        info!(
            "Deal evicted from cache deal_id={} dirty={} revision={}",
            id, entry.dirty, entry.revision
        );
        Some(entry.deal.clone())
    }

    /// Cached slot, or load it once from the store
    async fn slot(&self, id: DealId) -> CacheResult<Slot> {
        if let Some(slot) = self.lookup(id) {
            return Ok(slot);
        }

        let gate = Arc::clone(
            self.loading
                .entry(id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .value(),
        );
        let guard = gate.lock().await;

        let result = match self.lookup(id) {
            Some(slot) => Ok(slot),
            None => self.load(id).await,
        };

        drop(guard);
        self.loading
            .remove_if(&id, |_, current| Arc::ptr_eq(current, &gate));
        result
    }

    async fn load(&self, id: DealId) -> CacheResult<Slot> {
        let deal = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CacheError::NotFound(id))?;
        let now = self.clock.now();

        // A concurrent `set` may have inserted the deal while we were loading
        let slot = Arc::clone(
            self.entries
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(CacheEntry::new(deal, now, false))))
                .value(),
        );
        debug!("Deal loaded into cache deal_id={}", id);
        Ok(slot)
    }
}
