//! Dealroom Reconciler
//!
//! Background jobs that keep the durable store in line with the write-back
//! cache.
//!
//! ```text
//!            every 10s                  every 10s                every 5m
//!          ┌────────────┐           ┌──────────────┐         ┌──────────────┐
//!          │ sync       │           │ evict        │         │ expire       │
//!          │ changed()  │           │ stale()      │         │ query_expired│
//!          │  └► save   │           │  └► save once│         │  └► DealService
//!          │  └► synced │           │  └► evict    │         │     ::finish_expired
//!          └────────────┘           └──────────────┘         └──────────────┘
//! ```
//!
//! Overlapping ticks of the same job are skipped, and sync and eviction
//! never save concurrently. Shutting the handle down
//! stops the loops and runs one last sync.

mod config;
mod reconciler;
mod report;

pub use config::ReconcilerConfig;
pub use reconciler::{Job, Reconciler, ReconcilerHandle};
pub use report::{TickOutcome, TickReport};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dealroom_cache::WriteBackCache;
    use dealroom_clock::ManualClock;
    use dealroom_core::{
        Actor, AuctionStats, Deal, DealEvent, DealItem, DealMode, DealStatus, NewDeal, UserId,
        UserNotice,
    };
    use dealroom_deal_manager::{DealService, RequestContext};
    use dealroom_ports::{Clock, DealStore, DeliveryError, EventSink, Notifier, StatsRecorder};
    use dealroom_store::InMemoryDealStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    struct Quiet;

    impl EventSink for Quiet {
        fn emit(&self, _event: DealEvent) {}
    }

    #[async_trait]
    impl StatsRecorder for Quiet {
        async fn record_deal(&self, _deal: &Deal) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for Quiet {
        async fn notify_user(&self, _user: UserId, _notice: UserNotice) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<InMemoryDealStore>,
        cache: Arc<WriteBackCache>,
        clock: Arc<ManualClock>,
        deals: Arc<DealService>,
        reconciler: Arc<Reconciler>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDealStore::new());
        let clock = ManualClock::new(None);
        let cache = Arc::new(WriteBackCache::new(store.clone(), clock.clone()));
        let quiet = Arc::new(Quiet);
        let deals = Arc::new(DealService::new(
            cache.clone(),
            store.clone(),
            quiet.clone(),
            quiet.clone(),
            quiet,
            clock.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            cache.clone(),
            store.clone(),
            deals.clone(),
            clock.clone(),
            ReconcilerConfig::default(),
        ));
        Fixture {
            store,
            cache,
            clock,
            deals,
            reconciler,
        }
    }

    async fn seed(f: &Fixture) -> Deal {
        let new = NewDeal {
            auction_id: None,
            seller_id: Uuid::new_v4(),
            buyer_id: Some(Uuid::new_v4()),
            mode: DealMode::Direct,
            items: vec![DealItem::new(Uuid::new_v4(), Uuid::new_v4(), dec!(25))],
            starting_price: dec!(25),
            final_price: None,
            guarantee_enabled: false,
            guarantee_initiated_by: None,
            auto_cancel_at: None,
            auction_stats: AuctionStats::default(),
            requested_at: f.clock.now(),
        };
        f.store.create(new).await.unwrap()
    }

    fn seller(deal: &Deal) -> RequestContext {
        RequestContext::new(Actor::new(deal.seller_id, "seller"))
    }

    #[tokio::test]
    async fn test_sync_flushes_and_marks_clean() {
        let f = fixture();
        let deal = seed(&f).await;
        f.cache.register_online(deal.id, deal.seller_id);
        f.deals.start(&seller(&deal), deal.id).await.unwrap();

        let report = f.reconciler.sync_changed().await.report().unwrap();

        assert_eq!(report.flushed, 1);
        assert!(f.cache.changed().is_empty());
        assert_eq!(f.store.peek(deal.id).unwrap().status, DealStatus::Active);
    }

    #[tokio::test]
    async fn test_failed_sync_leaves_entry_dirty() {
        let f = fixture();
        let deal = seed(&f).await;
        f.deals.start(&seller(&deal), deal.id).await.unwrap();
        f.store.set_available(false);

        let report = f.reconciler.sync_changed().await.report().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(f.cache.changed().len(), 1);

        f.store.set_available(true);
        let report = f.reconciler.sync_changed().await.report().unwrap();
        assert_eq!(report.flushed, 1);
        assert!(f.cache.changed().is_empty());
    }

    #[tokio::test]
    async fn test_stale_dirty_entry_flushed_once_then_evicted_despite_failure() {
        let f = fixture();
        let deal = seed(&f).await;
        f.deals.start(&seller(&deal), deal.id).await.unwrap();
        f.store.set_available(false);

        let report = f.reconciler.evict_stale().await.report().unwrap();

        assert_eq!(f.store.save_count(), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.evicted, 1);
        assert!(!f.cache.contains(deal.id));

        let report = f.reconciler.evict_stale().await.report().unwrap();
        assert_eq!(report, TickReport::default());
        assert_eq!(f.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_entry_with_online_users_survives_until_idle() {
        let f = fixture();
        let deal = seed(&f).await;
        f.cache.get(deal.id).await.unwrap();
        f.cache.register_online(deal.id, deal.seller_id);

        let report = f.reconciler.evict_stale().await.report().unwrap();
        assert_eq!(report.evicted, 0);

        f.clock.advance(chrono::Duration::minutes(6));
        let report = f.reconciler.evict_stale().await.report().unwrap();
        assert_eq!(report.evicted, 1);
        assert_eq!(f.store.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sync_is_skipped() {
        let f = fixture();
        let deal = seed(&f).await;
        f.deals.start(&seller(&deal), deal.id).await.unwrap();
        f.store.set_latency(Duration::from_millis(50));

        let running = {
            let reconciler = f.reconciler.clone();
            tokio::spawn(async move { reconciler.sync_changed().await })
        };
        tokio::task::yield_now().await;

        assert!(f.reconciler.sync_changed().await.is_skipped());
        let first = running.await.unwrap().report().unwrap();
        assert_eq!(first.flushed, 1);
        assert!(!f.reconciler.sync_changed().await.is_skipped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_waits_for_slow_sync_and_keeps_latest_revision() {
        let f = fixture();
        let deal = seed(&f).await;
        f.deals.start(&seller(&deal), deal.id).await.unwrap();
        f.store.set_latency(Duration::from_millis(500));

        let slow_sync = {
            let reconciler = f.reconciler.clone();
            tokio::spawn(async move { reconciler.sync_changed().await })
        };
        tokio::task::yield_now().await;

        f.store.set_latency(Duration::ZERO);
        f.deals.close(&seller(&deal), deal.id).await.unwrap();
        f.clock.advance(chrono::Duration::minutes(6));

        assert!(f.reconciler.evict_stale().await.is_skipped());
        assert!(f.cache.contains(deal.id));

        slow_sync.await.unwrap().report().unwrap();
        assert_eq!(f.store.peek(deal.id).unwrap().status, DealStatus::Active);

        let report = f.reconciler.evict_stale().await.report().unwrap();
        assert_eq!(report.flushed, 1);
        assert_eq!(report.evicted, 1);
        assert_eq!(f.store.peek(deal.id).unwrap().status, DealStatus::Ended);
    }
}
