//! Dealroom Gateway
//!
//! Realtime surface of the deal lifecycle. Provides:
//! - Wire message types (client events, reply envelopes, pushes)
//! - Room fan-out over tokio broadcast channels
//! - The connection lifecycle: admit, authorize, track, close
//!
//! ## Architecture
//!
//! ```text
//!   client ──ClientEvent──▶ DealGateway ──▶ DealService / ChatService
//!      ▲                        │                    │
//!      │ Envelope ◀─────────────┘                    │ DealEvent, UserNotice
//!      │                                             ▼
//!      └──── mpsc outbound ◀── forwarder ◀──── RoomHub
//!                                            rooms: deal_id → broadcast
//!                                            users: user_id → broadcast
//! ```
//!
//! The gateway consumes already-authenticated [`dealroom_core::Actor`]
//! values; authentication itself happens in front of it.

pub mod config;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod transport;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ClientSession, DealGateway};
pub use messages::{ClientEvent, Envelope, ServerMessage};
pub use transport::RoomHub;
