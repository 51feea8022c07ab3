//! Read models derived from the deal aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{ChatMessage, Deal, DealMode, Participant};
use crate::values::{CoinId, ConditionId, DealId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub role: Participant,
}

/// Deal as pushed to clients: the aggregate plus its resolved participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub participants: Vec<ParticipantView>,
}

impl DealView {
    pub fn build(deal: &Deal) -> Self {
        let mut participants = vec![ParticipantView {
            user_id: deal.seller_id,
            role: Participant::Seller,
        }];
        if let Some(buyer_id) = deal.buyer_id {
            participants.push(ParticipantView {
                user_id: buyer_id,
                role: Participant::Buyer,
            });
        }
        Self {
            deal: deal.clone(),
            participants,
        }
    }

    pub fn id(&self) -> DealId {
        self.deal.id
    }
}

/// Message touched by a chat operation, with the room it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub deal_id: DealId,
    pub message: ChatMessage,
}

/// One row per sold item, fed to the stats pipeline when a deal finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStatRow {
    pub deal_id: DealId,
    pub coin_id: CoinId,
    pub seller_id: UserId,
    pub buyer_id: Option<UserId>,
    pub condition_id: Option<ConditionId>,
    pub price: Decimal,
    pub quantity: u32,
    pub mode: DealMode,
    pub sold_at: Timestamp,
}

impl DealStatRow {
    /// Rows for every item; items without their own price fall back to the deal price
    pub fn from_deal(deal: &Deal, now: Timestamp) -> Vec<Self> {
        let sold_at = deal.ended_at.unwrap_or(now);
        deal.items
            .iter()
            .map(|item| Self {
                deal_id: deal.id,
                coin_id: item.coin_id,
                seller_id: deal.seller_id,
                buyer_id: deal.buyer_id,
                condition_id: item.condition_id,
                price: if item.price.is_zero() {
                    deal.settled_price()
                } else {
                    item.price
                },
                quantity: item.quantity,
                mode: deal.mode,
                sold_at,
            })
            .collect()
    }
}
