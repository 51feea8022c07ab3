use dealroom_core::ConnectionId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Too many messages, retry in {}ms", retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
