use dealroom_core::AuctionId;
use thiserror::Error;

/// Errors raised by a durable deal store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("A deal already exists for auction {0}")]
    DuplicateAuction(AuctionId),

    #[error("Store error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by outbound effects (stats, notifications)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery failed: {0}")]
    Failed(String),

    #[error("Recipient unreachable: {0}")]
    Unreachable(String),
}

/// Errors raised while re-validating a participant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Validation lookup failed: {0}")]
    Lookup(String),
}
