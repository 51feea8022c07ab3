//! In-process fan-out
//!
//! Deal rooms and per-user channels are tokio broadcast channels. Each
//! connection drains the ones it joined into its own mpsc outbound queue.

pub mod forward;
pub mod hub;

pub use forward::spawn_forwarder;
pub use hub::RoomHub;
