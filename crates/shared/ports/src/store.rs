use async_trait::async_trait;
use dealroom_core::{AuctionId, Deal, DealId, DealStatus, NewDeal, Timestamp, UserId};

use crate::error::StoreResult;

/// Query predicate for [`DealStore::find_one`]
///
/// Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealFilter {
    pub auction_id: Option<AuctionId>,
    pub seller_id: Option<UserId>,
    pub buyer_id: Option<UserId>,
    pub status: Option<DealStatus>,
    /// Skip cancelled deals
    pub exclude_cancelled: bool,
}

impl DealFilter {
    /// The live deal opened from an auction
    pub fn by_auction(auction_id: AuctionId) -> Self {
        Self {
            auction_id: Some(auction_id),
            exclude_cancelled: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, deal: &Deal) -> bool {
        if self.exclude_cancelled && deal.status == DealStatus::Cancelled {
            return false;
        }
        if self.auction_id.is_some() && self.auction_id != deal.auction_id {
            return false;
        }
        if self.seller_id.is_some_and(|id| id != deal.seller_id) {
            return false;
        }
        if self.buyer_id.is_some() && self.buyer_id != deal.buyer_id {
            return false;
        }
        self.status.is_none_or(|status| status == deal.status)
    }
}

/// Durable storage for deal aggregates
///
/// The store is the source of truth for any deal not held by the cache.
#[async_trait]
pub trait DealStore: Send + Sync {
    async fn find_by_id(&self, id: DealId) -> StoreResult<Option<Deal>>;

    async fn find_one(&self, filter: &DealFilter) -> StoreResult<Option<Deal>>;

    /// Persist the full aggregate, returning the stored version
    async fn save(&self, deal: &Deal) -> StoreResult<Deal>;

    /// Insert a new deal. Fails with `DuplicateAuction` when a live deal
    /// already exists for the same auction.
    async fn create(&self, new: NewDeal) -> StoreResult<Deal>;

    /// Deals whose auto-cancel deadline is at or before `now` and that are not finalized
    async fn query_expired(&self, now: Timestamp) -> StoreResult<Vec<Deal>>;
}
