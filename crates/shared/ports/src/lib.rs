//! Dealroom Ports
//!
//! Port definitions (traits) for the deal lifecycle.
//! These define the boundaries between domain logic and infrastructure:
//! durable storage, event fan-out, stats, notifications and time.

mod clock;
mod error;
mod events;
mod store;

pub use clock::Clock;
pub use error::{DeliveryError, StoreError, StoreResult, ValidationError};
pub use events::{EventSink, Notifier, ParticipantValidator, StatsRecorder};
pub use store::{DealFilter, DealStore};
