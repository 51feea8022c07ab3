use serde::{Deserialize, Serialize};

use crate::values::{Timestamp, UserId};

/// Kind of a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimelineKind {
    #[serde(rename = "deal.started")]
    DealStarted,
    #[serde(rename = "buyer.payment_confirmed")]
    PaymentConfirmed,
    #[serde(rename = "seller.delivery_confirmed")]
    DeliveryConfirmed,
    #[serde(rename = "buyer.acceptance_confirmed")]
    AcceptanceConfirmed,
    #[serde(rename = "deal.closed")]
    DealClosed,
    #[serde(rename = "deal.expired")]
    DealExpired,
    #[serde(rename = "deal.cancelled")]
    DealCancelled,
    #[serde(rename = "deal.dispute_opened")]
    DisputeOpened,
    #[serde(rename = "counter_offer.created")]
    CounterOfferCreated,
    #[serde(rename = "counter_offer.responded")]
    CounterOfferResponded,
}

/// Append-only audit record on a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub kind: TimelineKind,
    pub at: Timestamp,
    /// `None` for entries written by the scheduler
    pub actor: Option<UserId>,
    pub payload: Option<serde_json::Value>,
}

impl TimelineEntry {
    pub fn new(kind: TimelineKind, actor: Option<UserId>, at: Timestamp) -> Self {
        Self {
            kind,
            at,
            actor,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
