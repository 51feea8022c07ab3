//! Error types for the gateway crate

use dealroom_core::{ConnectionId, DealId};
use dealroom_deal_manager::{DealError, ErrorCode};
use dealroom_ports::ValidationError;
use dealroom_session::SessionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Deal(#[from] DealError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("Connection is bound to deal {bound}, not {requested}")]
    WrongDeal { bound: DealId, requested: DealId },

    #[error("Not a participant of deal {0}")]
    NotParticipant(DealId),

    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    #[error("Participant check failed: {0}")]
    Lookup(#[from] ValidationError),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Deal(err) => err.code(),
            GatewayError::Session(SessionError::RateLimited { .. }) => ErrorCode::RateLimited,
            GatewayError::Session(SessionError::UnknownConnection(_))
            | GatewayError::UnknownConnection(_) => ErrorCode::NotFound,
            GatewayError::Malformed(_) | GatewayError::WrongDeal { .. } => ErrorCode::Validation,
            GatewayError::NotParticipant(_) => ErrorCode::Forbidden,
            GatewayError::Lookup(_) => ErrorCode::Infrastructure,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_codes() {
        let limited = GatewayError::from(SessionError::RateLimited {
            retry_after: Duration::from_secs(6),
        });
        assert_eq!(limited.code(), ErrorCode::RateLimited);
        assert_eq!(limited.code().status(), 429);

        let conflict = GatewayError::from(DealError::InvalidTransition("closed".into()));
        assert_eq!(conflict.code().status(), 409);

        let lookup = GatewayError::from(ValidationError::Lookup("down".into()));
        assert_eq!(lookup.code(), ErrorCode::Infrastructure);
    }
}
