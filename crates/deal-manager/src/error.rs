//! Deal service errors

use dealroom_cache::CacheError;
use dealroom_lifecycle::TransitionError;
use dealroom_ports::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Client-facing error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Forbidden,
    InvalidTransition,
    RateLimited,
    Infrastructure,
}

impl ErrorCode {
    /// HTTP-like status carried in error envelopes
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::Validation => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::InvalidTransition => 409,
            ErrorCode::RateLimited => 429,
            ErrorCode::Infrastructure => 503,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "validation",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::Infrastructure => "infrastructure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DealError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl DealError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DealError::Validation(_) => ErrorCode::Validation,
            DealError::NotFound(_) => ErrorCode::NotFound,
            DealError::Forbidden(_) => ErrorCode::Forbidden,
            DealError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            DealError::Infrastructure(_) => ErrorCode::Infrastructure,
        }
    }
}

impl From<TransitionError> for DealError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Forbidden(msg) => DealError::Forbidden(msg),
            TransitionError::InvalidTransition(msg) => DealError::InvalidTransition(msg),
            TransitionError::NotFound(msg) => DealError::NotFound(msg),
            TransitionError::Validation(msg) => DealError::Validation(msg),
        }
    }
}

impl From<CacheError> for DealError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(id) => DealError::NotFound(format!("deal {id}")),
            CacheError::Store(store) => store.into(),
        }
    }
}

impl From<StoreError> for DealError {
    fn from(err: StoreError) -> Self {
        DealError::Infrastructure(err.to_string())
    }
}

pub type DealResult<T> = std::result::Result<T, DealError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_cache_errors_map_to_codes() {
        let missing = DealError::from(CacheError::NotFound(Uuid::new_v4()));
        let down = DealError::from(CacheError::Store(StoreError::Unavailable("db".into())));

        assert_eq!(missing.code(), ErrorCode::NotFound);
        assert_eq!(down.code(), ErrorCode::Infrastructure);
        assert_eq!(down.code().status(), 503);
    }

    #[test]
    fn test_transition_errors_keep_their_class() {
        let err = DealError::from(TransitionError::InvalidTransition("closed".into()));
        assert_eq!(err.code(), ErrorCode::InvalidTransition);
        assert_eq!(err.code().status(), 409);
        assert_eq!(err.code().as_str(), "invalid_transition");
    }
}
