use dealroom_core::{Actor, UserId};
use uuid::Uuid;

/// Who is calling and under which request id
///
/// Passed explicitly through every service call so log lines can be tied
/// back to the inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Actor,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.actor.user_id
    }
}
