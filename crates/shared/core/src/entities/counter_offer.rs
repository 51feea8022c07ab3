use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{CounterOfferId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterOfferStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    AutoAccepted,
    Expired,
}

/// Proposed price revision attached to a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOffer {
    pub id: CounterOfferId,
    pub author: UserId,
    pub price: Decimal,
    pub status: CounterOfferStatus,
    pub message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CounterOffer {
    pub fn is_pending(&self) -> bool {
        self.status == CounterOfferStatus::Pending
    }
}
