//! Dealroom Store
//!
//! In-memory implementation of the [`DealStore`] port. It keeps a unique
//! index of live deals per auction and can simulate a slow or unavailable
//! backend, which the cache and reconciler tests rely on.

mod in_memory;

pub use in_memory::InMemoryDealStore;

// Re-export the port for convenience
pub use dealroom_ports::{DealFilter, DealStore, StoreError, StoreResult};
