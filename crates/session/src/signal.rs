use serde::{Deserialize, Serialize};

/// Callback run once when a session timer decides a connection must go
pub type SessionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Why the server closed a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisconnectReason {
    /// Evicted to make room for a newer connection of the same user
    MaxConnectionsExceeded,
    InactivityTimeout,
    /// Periodic participant check failed
    ValidationFailed,
    /// Client or server closed normally
    Closed,
}

impl DisconnectReason {
    pub fn event_name(&self) -> &'static str {
        match self {
            DisconnectReason::MaxConnectionsExceeded => "maxConnectionsExceeded",
            DisconnectReason::InactivityTimeout => "inactivityTimeout",
            DisconnectReason::ValidationFailed => "validationFailed",
            DisconnectReason::Closed => "closed",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DisconnectReason::MaxConnectionsExceeded => {
                "You were disconnected because you logged in from another device"
            }
            DisconnectReason::InactivityTimeout => "You were disconnected due to inactivity",
            DisconnectReason::ValidationFailed => "You no longer have access to this deal",
            DisconnectReason::Closed => "Connection closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_matches_event_name() {
        for reason in [
            DisconnectReason::MaxConnectionsExceeded,
            DisconnectReason::InactivityTimeout,
            DisconnectReason::ValidationFailed,
            DisconnectReason::Closed,
        ] {
            let wire = serde_json::to_value(reason).unwrap();
            assert_eq!(wire, serde_json::Value::from(reason.event_name()));
        }
    }
}
