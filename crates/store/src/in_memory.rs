use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dealroom_core::{AuctionId, Deal, DealId, DealStatus, NewDeal, Timestamp};
use dealroom_ports::{DealFilter, DealStore, StoreError, StoreResult};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// In-memory deal store
///
/// Thread-safe storage for deals using DashMap.
/// Suitable for local runs and testing.
pub struct InMemoryDealStore {
    /// Deals by ID
    deals: Arc<DashMap<DealId, Deal>>,
    /// Index: auction_id -> live deal_id
    auction_index: Arc<DashMap<AuctionId, DealId>>,
    /// When false every call fails with `Unavailable`
    available: Arc<AtomicBool>,
    /// Artificial latency applied to every call, in milliseconds
    latency_ms: Arc<AtomicU64>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryDealStore {
    pub fn new() -> Self {
        Self {
            deals: Arc::new(DashMap::new()),
            auction_index: Arc::new(DashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
            latency_ms: Arc::new(AtomicU64::new(0)),
            loads: Arc::new(AtomicUsize::new(0)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed a deal directly, bypassing counters and failure simulation
    pub fn insert(&self, deal: Deal) {
        if let Some(auction_id) = deal.auction_id {
            if deal.status != DealStatus::Cancelled {
                self.auction_index.insert(auction_id, deal.id);
            }
        }
        self.deals.insert(deal.id, deal);
    }

    /// Read a deal without touching counters
    pub fn peek(&self, id: DealId) -> Option<Deal> {
        self.deals.get(&id).map(|d| d.value().clone())
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `find_by_id` calls served
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `save` calls attempted
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    async fn round_trip(&self, op: &str) -> StoreResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            warn!("InMemoryDealStore unavailable op={}", op);
            return Err(StoreError::Unavailable(format!("{op} rejected")));
        }
        Ok(())
    }
}

impl Default for InMemoryDealStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryDealStore {
    fn clone(&self) -> Self {
        Self {
            deals: Arc::clone(&self.deals),
            auction_index: Arc::clone(&self.auction_index),
            available: Arc::clone(&self.available),
            latency_ms: Arc::clone(&self.latency_ms),
            loads: Arc::clone(&self.loads),
            saves: Arc::clone(&self.saves),
        }
    }
}

#[async_trait]
impl DealStore for InMemoryDealStore {
    async fn find_by_id(&self, id: DealId) -> StoreResult<Option<Deal>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.round_trip("find_by_id").await?;
        Ok(self.peek(id))
    }

    async fn find_one(&self, filter: &DealFilter) -> StoreResult<Option<Deal>> {
        self.round_trip("find_one").await?;

        if let Some(auction_id) = filter.auction_id {
            let indexed = self
                .auction_index
                .get(&auction_id)
                .and_then(|id| self.peek(*id.value()));
            if let Some(deal) = indexed.filter(|d| filter.matches(d)) {
                return Ok(Some(deal));
            }
        }

        Ok(self
            .deals
            .iter()
            .find(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, deal: &Deal) -> StoreResult<Deal> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.round_trip("save").await?;

        if deal.status == DealStatus::Cancelled {
            if let Some(auction_id) = deal.auction_id {
                self.auction_index
                    .remove_if(&auction_id, |_, indexed| *indexed == deal.id);
            }
        }
        self.deals.insert(deal.id, deal.clone());
        debug!("Deal saved deal_id={} status={}", deal.id, deal.status);
        Ok(deal.clone())
    }

    async fn create(&self, new: NewDeal) -> StoreResult<Deal> {
        self.round_trip("create").await?;

        let deal = Deal::open(Uuid::new_v4(), new);
        if let Some(auction_id) = deal.auction_id {
            match self.auction_index.entry(auction_id) {
                Entry::Occupied(mut indexed) => {
                    let live = self
                        .deals
                        .get(indexed.get())
                        .is_some_and(|d| d.status != DealStatus::Cancelled);
                    if live {
                        return Err(StoreError::DuplicateAuction(auction_id));
                    }
                    indexed.insert(deal.id);
                }
                Entry::Vacant(slot) => {
                    slot.insert(deal.id);
                }
            }
        }
        self.deals.insert(deal.id, deal.clone());
        debug!("Deal created deal_id={} seller={}", deal.id, deal.seller_id);
        Ok(deal)
    }

    async fn query_expired(&self, now: Timestamp) -> StoreResult<Vec<Deal>> {
        self.round_trip("query_expired").await?;
        Ok(self
            .deals
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.value().clone())
            .collect())
    }
}
