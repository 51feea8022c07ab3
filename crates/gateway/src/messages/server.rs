//! Server → client messages: response envelopes and pushes

use dealroom_core::{DealEvent, DealView, MessageView, UserNotice};
use dealroom_deal_manager::ErrorCode;
use dealroom_session::DisconnectReason;
use serde::{Deserialize, Serialize};

/// Reply to exactly one inbound event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Error {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    Ok {
        status: u16,
        data: serde_json::Value,
    },
}

impl Envelope {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Envelope::Ok { status: 200, data },
            Err(err) => Envelope::error(ErrorCode::Infrastructure, format!("encoding failed: {err}")),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Envelope::Error {
            status: code.status(),
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Envelope::Ok { status, .. } | Envelope::Error { status, .. } => *status,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Envelope::Error { code, .. } => Some(*code),
            Envelope::Ok { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Envelope::Ok { data, .. } => Some(data),
            Envelope::Error { .. } => None,
        }
    }
}

/// Message pushed over a connection's outbound channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    DealCreated(DealView),
    DealUpdated(DealView),
    DealFinished(DealView),
    DealMessageAdded(MessageView),
    /// Reaction added, replaced or removed; carries the message as it is now
    DealMessageReaction(MessageView),
    Notification(UserNotice),
    MaxConnectionsExceeded { message: String },
    InactivityTimeout { message: String },
    ValidationFailed { message: String },
    Closed { message: String },
}

impl ServerMessage {
    pub fn disconnect(reason: DisconnectReason) -> Self {
        let message = reason.message().to_string();
        match reason {
            DisconnectReason::MaxConnectionsExceeded => {
                ServerMessage::MaxConnectionsExceeded { message }
            }
            DisconnectReason::InactivityTimeout => ServerMessage::InactivityTimeout { message },
            DisconnectReason::ValidationFailed => ServerMessage::ValidationFailed { message },
            DisconnectReason::Closed => ServerMessage::Closed { message },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::DealCreated(_) => "dealCreated",
            ServerMessage::DealUpdated(_) => "dealUpdated",
            ServerMessage::DealFinished(_) => "dealFinished",
            ServerMessage::DealMessageAdded(_) => "dealMessageAdded",
            ServerMessage::DealMessageReaction(_) => "dealMessageReaction",
            ServerMessage::Notification(_) => "notification",
            ServerMessage::MaxConnectionsExceeded { .. } => "maxConnectionsExceeded",
            ServerMessage::InactivityTimeout { .. } => "inactivityTimeout",
            ServerMessage::ValidationFailed { .. } => "validationFailed",
            ServerMessage::Closed { .. } => "closed",
        }
    }

    /// True for the final message a connection receives
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ServerMessage::MaxConnectionsExceeded { .. }
                | ServerMessage::InactivityTimeout { .. }
                | ServerMessage::ValidationFailed { .. }
                | ServerMessage::Closed { .. }
        )
    }
}

impl From<DealEvent> for ServerMessage {
    fn from(event: DealEvent) -> Self {
        match event {
            DealEvent::Created(view) => ServerMessage::DealCreated(view),
            DealEvent::Changed(view) => ServerMessage::DealUpdated(view),
            DealEvent::Finished(view) => ServerMessage::DealFinished(view),
            DealEvent::MessageAdded(message) => ServerMessage::DealMessageAdded(message),
            DealEvent::ReactionAdded(message) | DealEvent::ReactionRemoved(message) => {
                ServerMessage::DealMessageReaction(message)
            }
        }
    }
}
