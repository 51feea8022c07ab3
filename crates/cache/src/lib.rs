//! Dealroom Write-Back Cache
//!
//! Authoritative in-memory home of every deal someone is working on.
//!
//! ```text
//!   get / mutate / set / touch          changed / mark_synced
//!   (gateway, services)                 stale_entries / evict
//!          │                            (reconciler)
//!          ▼                                  │
//!   ┌───────────────────────────────────┐     │
//!   │ DealId ─► Mutex<CacheEntry>       │◄────┘
//!   │   deal, dirty, revision,          │
//!   │   last_activity                   │
//!   ├───────────────────────────────────┤
//!   │ DealId ─► online users            │
//!   │   (kept across eviction)          │
//!   └───────────────┬───────────────────┘
//!                   │ miss: single-flight load
//!                   ▼
//!               DealStore
//! ```
//!
//! Entries are created clean on first access, go dirty on every mutation,
//! turn clean again after a successful flush and leave the map when the
//! reconciler evicts them.

mod cache;
mod config;
mod entry;
mod error;

pub use cache::WriteBackCache;
pub use config::CacheConfig;
pub use entry::{DirtyDeal, EntryStatus, StaleEntry};
pub use error::{CacheError, CacheResult};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use dealroom_clock::ManualClock;
    use dealroom_ports::Clock;
    use dealroom_core::{AuctionStats, Deal, DealItem, DealMode, DealStatus, NewDeal};
    use dealroom_store::InMemoryDealStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn sample_deal() -> Deal {
        Deal::open(
            Uuid::new_v4(),
            NewDeal {
                auction_id: None,
                seller_id: Uuid::new_v4(),
                buyer_id: Some(Uuid::new_v4()),
                mode: DealMode::Direct,
                items: vec![DealItem::new(Uuid::new_v4(), Uuid::new_v4(), dec!(15))],
                starting_price: dec!(15),
                final_price: None,
                guarantee_enabled: false,
                guarantee_initiated_by: None,
                auto_cancel_at: None,
                auction_stats: AuctionStats::default(),
                requested_at: Utc::now(),
            },
        )
    }

    fn setup() -> (WriteBackCache, InMemoryDealStore, Arc<ManualClock>) {
        let store = InMemoryDealStore::new();
        let clock = ManualClock::new(None);
        let cache = WriteBackCache::new(Arc::new(store.clone()), clock.clone());
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_set_then_get_reads_own_write_without_store() {
        let (cache, store, _clock) = setup();
        let mut deal = sample_deal();
        deal.status = DealStatus::Active;

        cache.set(deal.clone(), true);
        let cached = cache.get(deal.id).await.unwrap();

        assert_eq!(cached, deal);
        assert_eq!(store.load_count(), 0);
        assert!(cache.status(deal.id).unwrap().dirty);
    }

    #[tokio::test]
    async fn test_get_loads_once_and_starts_clean() {
        let (cache, store, clock) = setup();
        let deal = sample_deal();
        store.insert(deal.clone());

        let loaded = cache.get(deal.id).await.unwrap();
        cache.get(deal.id).await.unwrap();

        assert_eq!(loaded.id, deal.id);
        assert_eq!(store.load_count(), 1);
        let status = cache.status(deal.id).unwrap();
        assert!(!status.dirty);
        assert_eq!(status.last_synced, clock.now());
    }

    #[tokio::test]
    async fn test_get_miss_reports_not_found_or_store_failure() {
        let (cache, store, _clock) = setup();
        let missing = Uuid::new_v4();
        assert_eq!(cache.get(missing).await, Err(CacheError::NotFound(missing)));

        store.set_available(false);
        assert!(matches!(
            cache.get(missing).await,
            Err(CacheError::Store(_))
        ));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_clears_dirty_and_touch_does_not_restore_it() {
        let (cache, _store, clock) = setup();
        let deal = sample_deal();
        cache.set(deal.clone(), true);

        let changed = cache.changed();
        assert_eq!(changed.len(), 1);

        clock.advance(Duration::seconds(3));
        assert!(cache.mark_synced(deal.id, changed[0].revision));
        assert!(cache.changed().is_empty());
        assert_eq!(cache.status(deal.id).unwrap().last_synced, clock.now());

        assert!(cache.touch(deal.id));
        assert!(cache.changed().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_during_flush_keeps_entry_dirty() {
        let (cache, _store, _clock) = setup();
        let deal = sample_deal();
        cache.set(deal.clone(), true);
        let snapshot = cache.changed().remove(0);

        cache
            .mutate(deal.id, |d| {
                d.status = DealStatus::Active;
                Ok::<_, CacheError>(())
            })
            .await
            .unwrap();

        assert!(!cache.mark_synced(deal.id, snapshot.revision));
        let pending = cache.changed();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].deal.status, DealStatus::Active);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_entry_clean() {
        let (cache, store, _clock) = setup();
        let deal = sample_deal();
        store.insert(deal.clone());

        let result: Result<(), CacheError> = cache
            .mutate(deal.id, |_| Err(CacheError::NotFound(deal.id)))
            .await;

        assert!(result.is_err());
        assert!(cache.changed().is_empty());
    }

    #[tokio::test]
    async fn test_set_without_dirty_flag_keeps_entry_clean() {
        let (cache, _store, _clock) = setup();
        let deal = sample_deal();

        cache.set(deal.clone(), false);
        assert!(cache.changed().is_empty());
        assert_eq!(cache.peek(deal.id), Some(deal));
    }

    #[tokio::test]
    async fn test_stale_entries_by_idle_time_or_empty_presence() {
        let (cache, _store, clock) = setup();
        let watched = sample_deal();
        let abandoned = sample_deal();
        let user = watched.seller_id;
        cache.set(watched.clone(), false);
        cache.set(abandoned.clone(), true);
        cache.register_online(watched.id, user);

        let stale = cache.stale_entries(Duration::minutes(5));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].deal.id, abandoned.id);
        assert!(stale[0].dirty);

        clock.advance(Duration::minutes(5));
        let stale = cache.stale_entries(Duration::minutes(5));
        assert_eq!(stale.len(), 2);
        let watched_entry = stale.iter().find(|e| e.deal.id == watched.id).unwrap();
        assert_eq!(watched_entry.online_user_ids, vec![user]);

        cache.unregister_online(watched.id, user);
        assert!(cache.online_users(watched.id).is_empty());
    }

    #[tokio::test]
    async fn test_presence_survives_eviction_and_reload() {
        let (cache, store, clock) = setup();
        let deal = sample_deal();
        store.insert(deal.clone());
        cache.get(deal.id).await.unwrap();
        cache.register_online(deal.id, deal.seller_id);

        clock.advance(Duration::minutes(6));
        let revision = cache.status(deal.id).unwrap().revision;
        assert!(cache.evict(deal.id, revision));
        assert_eq!(cache.online_users(deal.id), vec![deal.seller_id]);

        cache.get(deal.id).await.unwrap();
        assert_eq!(cache.status(deal.id).unwrap().online_user_ids, vec![deal.seller_id]);
        assert!(cache.stale_entries(Duration::minutes(5)).is_empty());

        assert!(cache.unregister_online(deal.id, deal.seller_id));
        assert_eq!(cache.stale_entries(Duration::minutes(5)).len(), 1);
    }

    #[tokio::test]
    async fn test_evict_skips_entries_changed_since_snapshot() {
        let (cache, _store, _clock) = setup();
        let deal = sample_deal();
        cache.set(deal.clone(), true);
        let stale = cache.stale_entries(Duration::minutes(5)).remove(0);

        cache
            .mutate(deal.id, |_| Ok::<_, CacheError>(()))
            .await
            .unwrap();
        assert!(!cache.evict(deal.id, stale.revision));
        assert!(cache.contains(deal.id));

        let current = cache.status(deal.id).unwrap().revision;
        assert!(cache.evict(deal.id, current));
        assert!(!cache.contains(deal.id));
    }

    #[tokio::test]
    async fn test_mutate_after_remove_reloads_from_store() {
        let (cache, store, _clock) = setup();
        let deal = sample_deal();
        store.insert(deal.clone());

        cache.get(deal.id).await.unwrap();
        assert_eq!(cache.remove(deal.id).map(|d| d.id), Some(deal.id));
        assert!(cache.remove(deal.id).is_none());

        cache
            .mutate(deal.id, |d| {
                d.status = DealStatus::Active;
                Ok::<_, CacheError>(())
            })
            .await
            .unwrap();

        assert_eq!(store.load_count(), 2);
        assert_eq!(cache.peek(deal.id).map(|d| d.status), Some(DealStatus::Active));
    }
}
