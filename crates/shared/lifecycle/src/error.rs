use dealroom_core::DealStatus;
use thiserror::Error;

/// Rejections raised by the state machine and chat rules
///
/// A rejected call never leaves the deal partially modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl TransitionError {
    pub(crate) fn wrong_status(action: &str, status: DealStatus) -> Self {
        TransitionError::InvalidTransition(format!("cannot {action} while deal is {status}"))
    }
}

pub type TransitionResult<T> = std::result::Result<T, TransitionError>;
