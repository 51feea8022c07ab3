use serde::{Deserialize, Serialize};
use std::fmt;

/// Deal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Created, waiting for the seller to start it
    PendingSeller,
    /// Started by the seller (legacy direct flow)
    SellerStarted,
    /// Direct deal in progress
    Active,
    /// Guaranteed deal waiting for the buyer's payment
    AwaitingPayment,
    /// Paid, waiting for the seller to deliver
    AwaitingDelivery,
    /// Delivered, waiting for the buyer to accept
    AwaitingAcceptance,
    /// Accepted by the buyer, seller may close
    ReadyToClose,
    /// Closed or finished by schedule
    Ended,
    Cancelled,
    Dispute,
}

impl DealStatus {
    /// Returns true if no transition may leave this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Ended | DealStatus::Cancelled)
    }

    /// Returns true if the seller may close the deal from this status
    pub fn is_closable(&self) -> bool {
        matches!(
            self,
            DealStatus::ReadyToClose | DealStatus::Active | DealStatus::SellerStarted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::PendingSeller => "pending_seller",
            DealStatus::SellerStarted => "seller_started",
            DealStatus::Active => "active",
            DealStatus::AwaitingPayment => "awaiting_payment",
            DealStatus::AwaitingDelivery => "awaiting_delivery",
            DealStatus::AwaitingAcceptance => "awaiting_acceptance",
            DealStatus::ReadyToClose => "ready_to_close",
            DealStatus::Ended => "ended",
            DealStatus::Cancelled => "cancelled",
            DealStatus::Dispute => "dispute",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the handover is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealMode {
    /// Participants settle between themselves
    #[default]
    Direct,
    /// Payment and delivery go through the platform guarantee
    Guaranteed,
}
