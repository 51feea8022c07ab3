use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    ChatMessage, ChatSummary, Confirmations, CounterOffer, DealItem, DealMode, DealStatus,
    Dispute, Guarantee, Participant, TimelineEntry,
};
use crate::values::{AuctionId, CounterOfferId, DealId, MessageId, Timestamp, UserId};

/// Bidding figures copied from the originating auction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStats {
    pub total_bids: u32,
    pub highest_bid: Option<Decimal>,
    /// Auction duration in seconds
    pub auction_duration: Option<i64>,
}

/// Everything needed to open a deal; the store assigns the identity
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub auction_id: Option<AuctionId>,
    pub seller_id: UserId,
    pub buyer_id: Option<UserId>,
    pub mode: DealMode,
    pub items: Vec<DealItem>,
    pub starting_price: Decimal,
    pub final_price: Option<Decimal>,
    pub guarantee_enabled: bool,
    pub guarantee_initiated_by: Option<UserId>,
    pub auto_cancel_at: Option<Timestamp>,
    pub auction_stats: AuctionStats,
    pub requested_at: Timestamp,
}

/// Escrow/handover negotiation between a seller and a buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub auction_id: Option<AuctionId>,
    pub seller_id: UserId,
    /// Unset until a buyer is assigned
    pub buyer_id: Option<UserId>,
    pub mode: DealMode,
    pub status: DealStatus,
    pub items: Vec<DealItem>,
    pub starting_price: Decimal,
    pub final_price: Option<Decimal>,
    pub guarantee: Guarantee,
    pub confirmations: Confirmations,
    pub dispute: Dispute,
    pub timeline: Vec<TimelineEntry>,
    pub messages: Vec<ChatMessage>,
    pub chat: ChatSummary,
    pub counter_offers: Vec<CounterOffer>,
    pub auction_stats: AuctionStats,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
}

impl Deal {
    /// Build a fresh deal in `pending_seller` from a creation request
    pub fn open(id: DealId, new: NewDeal) -> Self {
        let at = new.requested_at;
        let initiated_by = new.guarantee_initiated_by;
        let seller_approved = initiated_by == Some(new.seller_id);
        let buyer_approved = initiated_by.is_some() && initiated_by == new.buyer_id;

        Self {
            id,
            auction_id: new.auction_id,
            seller_id: new.seller_id,
            buyer_id: new.buyer_id,
            mode: new.mode,
            status: DealStatus::PendingSeller,
            items: new.items,
            starting_price: new.starting_price,
            final_price: new.final_price,
            guarantee: Guarantee {
                enabled: new.guarantee_enabled,
                initiated_by,
                seller_approved,
                buyer_approved,
                seller_approved_at: seller_approved.then_some(at),
                buyer_approved_at: buyer_approved.then_some(at),
                auto_cancel_at: new.auto_cancel_at,
            },
            confirmations: Confirmations::default(),
            dispute: Dispute::default(),
            timeline: Vec::new(),
            messages: Vec::new(),
            chat: ChatSummary::default(),
            counter_offers: Vec::new(),
            auction_stats: new.auction_stats,
            created_at: at,
            updated_at: at,
            started_at: None,
            ended_at: None,
            paid_at: None,
        }
    }

    /// Side the user plays in this deal, if any
    pub fn participant(&self, user_id: UserId) -> Option<Participant> {
        if user_id == self.seller_id {
            Some(Participant::Seller)
        } else if Some(user_id) == self.buyer_id {
            Some(Participant::Buyer)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_guaranteed(&self) -> bool {
        self.mode == DealMode::Guaranteed && self.guarantee.enabled
    }

    pub fn auto_cancel_at(&self) -> Option<Timestamp> {
        self.guarantee.auto_cancel_at
    }

    /// True once the auto-cancel deadline has passed on an unfinalized deal
    pub fn is_expired(&self, now: Timestamp) -> bool {
        if self.status.is_terminal() || self.status == DealStatus::Dispute {
            return false;
        }
        self.auto_cancel_at().is_some_and(|deadline| deadline <= now)
    }

    pub fn next_message_id(&self) -> MessageId {
        self.messages.last().map_or(1, |m| m.id + 1)
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn counter_offer(&self, id: CounterOfferId) -> Option<&CounterOffer> {
        self.counter_offers.iter().find(|o| o.id == id)
    }

    pub fn counter_offer_mut(&mut self, id: CounterOfferId) -> Option<&mut CounterOffer> {
        self.counter_offers.iter_mut().find(|o| o.id == id)
    }

    /// Price the deal settles at: final price if agreed, else the starting price
    pub fn settled_price(&self) -> Decimal {
        self.final_price.unwrap_or(self.starting_price)
    }
}
