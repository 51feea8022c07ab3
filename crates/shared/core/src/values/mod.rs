use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a deal
pub type DealId = Uuid;

/// Unique identifier for a platform user (seller, buyer or admin)
pub type UserId = Uuid;

/// Auction a deal originated from
pub type AuctionId = Uuid;

/// Catalogue identifiers carried on deal items
pub type ItemId = Uuid;
pub type CoinId = Uuid;
pub type ConditionId = Uuid;

/// Unique identifier for a counter-offer
pub type CounterOfferId = Uuid;

/// Unique identifier for a live client connection
pub type ConnectionId = Uuid;

/// Chat message identifier, increasing within one deal
pub type MessageId = u64;
