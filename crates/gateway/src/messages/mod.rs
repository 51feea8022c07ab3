//! Wire message types for the deal room surface
//!
//! JSON with camelCase names; events are tagged as `{"event", "data"}`.

pub mod client;
pub mod server;

pub use client::ClientEvent;
pub use server::{Envelope, ServerMessage};
