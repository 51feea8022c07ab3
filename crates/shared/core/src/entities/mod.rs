mod chat;
mod counter_offer;
mod deal;
mod deal_status;
mod guarantee;
mod item;
mod participant;
mod timeline;

pub use chat::{AuthorSnapshot, ChatMessage, ChatSummary, MessageReaction, Reaction};
pub use counter_offer::{CounterOffer, CounterOfferStatus};
pub use deal::{AuctionStats, Deal, NewDeal};
pub use deal_status::{DealMode, DealStatus};
pub use guarantee::{Confirmation, Confirmations, Dispute, Guarantee};
pub use item::{DealItem, ItemStatus};
pub use participant::{Actor, Participant, Role};
pub use timeline::{TimelineEntry, TimelineKind};
