//! Recording fakes for the outbound ports

use async_trait::async_trait;
use dealroom_cache::WriteBackCache;
use dealroom_clock::ManualClock;
use dealroom_core::{Actor, Deal, DealEvent, DealItem, DealMode, NewDeal, UserId, UserNotice};
use dealroom_ports::{Clock, DealStore, DeliveryError, EventSink, Notifier, StatsRecorder};
use dealroom_store::InMemoryDealStore;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

use crate::{ChatService, DealService, RequestContext};

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DealEvent>>,
}

impl RecordingSink {
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DealEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Default)]
pub struct CountingStats {
    deals: Mutex<Vec<Deal>>,
}

impl CountingStats {
    pub fn count(&self) -> usize {
        self.deals.lock().len()
    }
}

#[async_trait]
impl StatsRecorder for CountingStats {
    async fn record_deal(&self, deal: &Deal) -> Result<(), DeliveryError> {
        self.deals.lock().push(deal.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    notices: Mutex<Vec<(UserId, UserNotice)>>,
}

impl CountingNotifier {
    pub fn notices_for(&self, user_id: UserId) -> usize {
        self.notices.lock().iter().filter(|(u, _)| *u == user_id).count()
    }

    pub fn total(&self) -> usize {
        self.notices.lock().len()
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify_user(&self, user_id: UserId, notice: UserNotice) -> Result<(), DeliveryError> {
        self.notices.lock().push((user_id, notice));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryDealStore>,
    pub cache: Arc<WriteBackCache>,
    pub events: Arc<RecordingSink>,
    pub stats: Arc<CountingStats>,
    pub notifier: Arc<CountingNotifier>,
    pub clock: Arc<ManualClock>,
    pub service: DealService,
    pub chat: ChatService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryDealStore::new());
        let clock = ManualClock::new(None);
        let cache = Arc::new(WriteBackCache::new(store.clone(), clock.clone()));
        let events = Arc::new(RecordingSink::default());
        let stats = Arc::new(CountingStats::default());
        let notifier = Arc::new(CountingNotifier::default());
        let service = DealService::new(
            cache.clone(),
            store.clone(),
            events.clone(),
            stats.clone(),
            notifier.clone(),
            clock.clone(),
        );
        let chat = ChatService::new(cache.clone(), events.clone(), clock.clone());
        Self {
            store,
            cache,
            events,
            stats,
            notifier,
            clock,
            service,
            chat,
        }
    }

    /// Store a direct deal with `items` lines priced at 100 each
    pub async fn seed_direct(&self, items: usize) -> Deal {
        let new = NewDeal {
            auction_id: None,
            seller_id: Uuid::new_v4(),
            buyer_id: Some(Uuid::new_v4()),
            mode: DealMode::Direct,
            items: (0..items)
                .map(|_| DealItem::new(Uuid::new_v4(), Uuid::new_v4(), dec!(100)))
                .collect(),
            starting_price: dec!(100),
            final_price: None,
            guarantee_enabled: false,
            guarantee_initiated_by: None,
            auto_cancel_at: None,
            auction_stats: Default::default(),
            requested_at: self.clock.now(),
        };
        match self.store.create(new).await {
            Ok(deal) => deal,
            Err(err) => panic!("seeding failed: {err}"),
        }
    }

    pub fn seller_ctx(&self, deal: &Deal) -> RequestContext {
        RequestContext::new(Actor::new(deal.seller_id, "seller"))
    }

    pub fn buyer_ctx(&self, deal: &Deal) -> RequestContext {
        let buyer = deal.buyer_id.unwrap_or_default();
        RequestContext::new(Actor::new(buyer, "buyer"))
    }
}
