//! Dealroom Clock Infrastructure
//!
//! Time sources behind the [`Clock`] port:
//!
//! ```text
//! SystemClock   wall time, used by the running service
//! ManualClock   frozen time moved by `advance`, used by tests
//! ```
//!
//! Cache activity, sync stamps and expiry deadlines read time through the port.
//! Session timers run on `tokio::time` instead so they can be paused in tests.

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use dealroom_ports::Clock;
