use dealroom_core::{Deal, Timestamp, UserId};

/// One cached deal with its bookkeeping
///
/// Owned by the cache; handed out only as cloned snapshots.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub(crate) deal: Deal,
    pub(crate) dirty: bool,
    /// Bumped on every mutation so a flush can tell whether it is still current
    pub(crate) revision: u64,
    pub(crate) last_activity: Timestamp,
    pub(crate) last_synced: Timestamp,
    /// Set under the lock when the entry leaves the map
    pub(crate) evicted: bool,
}

impl CacheEntry {
    pub(crate) fn new(deal: Deal, now: Timestamp, dirty: bool) -> Self {
        Self {
            deal,
            dirty,
            revision: u64::from(dirty),
            last_activity: now,
            last_synced: now,
            evicted: false,
        }
    }

    pub(crate) fn mark_dirty(&mut self, now: Timestamp) {
        self.dirty = true;
        self.revision += 1;
        self.last_activity = now;
    }
}

/// Dirty deal captured for a flush
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyDeal {
    pub deal: Deal,
    pub revision: u64,
}

/// Eviction candidate captured by [`crate::WriteBackCache::stale_entries`]
#[derive(Debug, Clone, PartialEq)]
pub struct StaleEntry {
    pub deal: Deal,
    pub dirty: bool,
    pub revision: u64,
    pub last_activity: Timestamp,
    pub online_user_ids: Vec<UserId>,
}

/// Bookkeeping view of one entry, for diagnostics and tests
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatus {
    pub dirty: bool,
    pub revision: u64,
    pub last_activity: Timestamp,
    pub last_synced: Timestamp,
    pub online_user_ids: Vec<UserId>,
}

impl EntryStatus {
    pub(crate) fn new(entry: &CacheEntry, online_user_ids: Vec<UserId>) -> Self {
        Self {
            dirty: entry.dirty,
            revision: entry.revision,
            last_activity: entry.last_activity,
            last_synced: entry.last_synced,
            online_user_ids,
        }
    }
}
