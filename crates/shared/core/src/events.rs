//! Domain events emitted after a deal changes

use serde::{Deserialize, Serialize};

use crate::values::{DealId, UserId};
use crate::views::{DealView, MessageView};

/// Event fanned out to every session in the deal's room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DealEvent {
    #[serde(rename = "deal.created")]
    Created(DealView),
    #[serde(rename = "deal.changed")]
    Changed(DealView),
    #[serde(rename = "deal.finished")]
    Finished(DealView),
    #[serde(rename = "deal.message.added")]
    MessageAdded(MessageView),
    #[serde(rename = "deal.reaction.added")]
    ReactionAdded(MessageView),
    #[serde(rename = "deal.reaction.removed")]
    ReactionRemoved(MessageView),
}

impl DealEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DealEvent::Created(_) => "deal.created",
            DealEvent::Changed(_) => "deal.changed",
            DealEvent::Finished(_) => "deal.finished",
            DealEvent::MessageAdded(_) => "deal.message.added",
            DealEvent::ReactionAdded(_) => "deal.reaction.added",
            DealEvent::ReactionRemoved(_) => "deal.reaction.removed",
        }
    }

    /// Room the event is delivered to
    pub fn room(&self) -> DealId {
        match self {
            DealEvent::Created(view) | DealEvent::Changed(view) | DealEvent::Finished(view) => {
                view.id()
            }
            DealEvent::MessageAdded(m)
            | DealEvent::ReactionAdded(m)
            | DealEvent::ReactionRemoved(m) => m.deal_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    DealFinished,
    DealCancelled,
}

/// Personal notification addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotice {
    pub kind: NoticeKind,
    pub deal_id: DealId,
    pub user_id: UserId,
    pub message: String,
}

impl UserNotice {
    pub fn deal_finished(deal_id: DealId, user_id: UserId) -> Self {
        Self {
            kind: NoticeKind::DealFinished,
            deal_id,
            user_id,
            message: format!("Deal {deal_id} has been completed"),
        }
    }

    pub fn deal_cancelled(deal_id: DealId, user_id: UserId) -> Self {
        Self {
            kind: NoticeKind::DealCancelled,
            deal_id,
            user_id,
            message: format!("Deal {deal_id} has been cancelled"),
        }
    }
}
