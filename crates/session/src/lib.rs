//! Dealroom Session Manager
//!
//! Per-user, per-connection bookkeeping for live deal rooms.
//!
//! ```text
//!              admit                track              refresh / check_message_rate
//!   gateway ─────────► Connection ─────────► Activity ◄─────────────── gateway
//!                      Registry              Tracker
//!                      (cap per user)        (idle timer per connection)
//!                                   │
//!                                   └──────► Validation   one timer per (deal, user)
//!                                            Registry     fan-out to every connection
//!
//!   MessageRateLimiter: sliding window per user, independent of the above
//! ```
//!
//! Timers run on `tokio::time`, so tests can pause and advance the clock.

mod activity;
mod config;
mod connections;
mod error;
mod manager;
mod rate_limit;
mod signal;
mod validation;

pub use activity::ActivityTracker;
pub use config::SessionConfig;
pub use connections::ConnectionRegistry;
pub use error::{SessionError, SessionResult};
pub use manager::{Admission, SessionBinding, SessionManager};
pub use rate_limit::MessageRateLimiter;
pub use signal::{DisconnectReason, SessionCallback};
pub use validation::ValidationRegistry;
