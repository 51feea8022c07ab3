use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{CoinId, ConditionId, ItemId};

/// Handover progress of a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Delivered,
    Accepted,
    Cancelled,
}

/// One line of a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealItem {
    pub item_id: ItemId,
    pub coin_id: CoinId,
    pub condition_id: Option<ConditionId>,
    pub quantity: u32,
    pub price: Decimal,
    pub status: ItemStatus,
    /// Catalogue data frozen at deal creation
    pub snapshot: Option<serde_json::Value>,
}

impl DealItem {
    pub fn new(item_id: ItemId, coin_id: CoinId, price: Decimal) -> Self {
        Self {
            item_id,
            coin_id,
            condition_id: None,
            quantity: 1,
            price,
            status: ItemStatus::Pending,
            snapshot: None,
        }
    }

    pub fn with_condition(mut self, condition_id: ConditionId) -> Self {
        self.condition_id = Some(condition_id);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }
}
