//! Dealroom Core Domain
//!
//! Pure domain types for the deal lifecycle: the deal aggregate, its chat log,
//! counter-offers, read models and domain events.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod events;
pub mod values;
pub mod views;

// Re-export commonly used types at crate root
pub use entities::{
    Actor, AuctionStats, AuthorSnapshot, ChatMessage, ChatSummary, Confirmation, Confirmations,
    CounterOffer, CounterOfferStatus, Deal, DealItem, DealMode, DealStatus, Dispute, Guarantee,
    ItemStatus, MessageReaction, NewDeal, Participant, Reaction, Role, TimelineEntry,
    TimelineKind,
};
pub use events::{DealEvent, NoticeKind, UserNotice};
pub use values::{
    AuctionId, CoinId, ConditionId, ConnectionId, CounterOfferId, DealId, ItemId, MessageId,
    Price, Timestamp, UserId,
};
pub use views::{DealStatRow, DealView, MessageView, ParticipantView};
