//! Dealroom Deal Manager
//!
//! Application services on top of the write-back cache:
//! - **DealService**: deal creation, details, every lifecycle transition and
//!   the one-off finish effects (stats, notices)
//! - **ChatService**: messages and reactions
//! - **DealParticipantValidator**: periodic "may this user stay in the room" check
//!
//! ```text
//! gateway / REST ──► RequestContext ──► DealService ──► WriteBackCache::mutate
//!                                           │                  (DealStateMachine)
//!                                           ├──► EventSink      room events
//!                                           ├──► StatsRecorder  once per finished deal
//!                                           └──► Notifier       seller + buyer
//! ```

mod chat;
mod context;
mod error;
mod service;
mod validator;

#[cfg(test)]
mod test_support;

pub use chat::ChatService;
pub use context::RequestContext;
pub use error::{DealError, DealResult, ErrorCode};
pub use service::{CreateDeal, DealService};
pub use validator::DealParticipantValidator;
