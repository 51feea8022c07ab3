//! Dealroom Runner
//!
//! Assembles the deal lifecycle into one process:
//!
//! - **Config**: JSON document with a section per component
//! - **Bootstrap**: builds the component graph and starts the reconciler
//! - **Stats**: logging stats sink for deployments without a pipeline
//!
//! ## Architecture
//!
//! ```text
//!        clients
//!           │ ClientEvent / Envelope
//!           ▼
//!    ┌─────────────┐      ┌────────────────┐
//!    │ DealGateway │─────▶│ SessionManager │
//!    └──────┬──────┘      └────────────────┘
//!           │
//!           ▼
//!    ┌──────────────────────────┐    events    ┌─────────┐
//!    │ DealService, ChatService │─────────────▶│ RoomHub │
//!    └────────────┬─────────────┘              └─────────┘
//!                 ▼
//!         ┌────────────────┐  sync / evict / expire  ┌────────────┐
//!         │ WriteBackCache │◀────────────────────────│ Reconciler │
//!         └───────┬────────┘                         └────────────┘
//!                 ▼
//!            DealStore
//! ```

pub mod bootstrap;
pub mod config;
pub mod stats;

pub use bootstrap::{Dealroom, bootstrap};
pub use config::{ConfigError, DealroomConfig, load_config, load_config_from_str, load_default_config};
pub use stats::RecordingStatsRecorder;
