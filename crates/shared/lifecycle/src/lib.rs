//! Dealroom Lifecycle
//!
//! Pure transition logic over the deal aggregate: the status state machine,
//! counter-offers and the chat log. No I/O, no async; callers hold the
//! per-deal lock while a rule runs.

pub mod chat;
mod error;
mod machine;
mod transition;

#[cfg(test)]
mod test_support;

pub use chat::{MAX_MESSAGE_LEN, ReactionChange, ReactionOutcome, append_message, set_reaction};
pub use error::{TransitionError, TransitionResult};
pub use machine::DealStateMachine;
pub use transition::{Effect, Transition};
