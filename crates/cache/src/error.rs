use dealroom_core::DealId;
use dealroom_ports::StoreError;
use thiserror::Error;

/// Errors surfaced by the cache on the load path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Deal not found: {0}")]
    NotFound(DealId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
