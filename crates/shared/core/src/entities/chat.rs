use serde::{Deserialize, Serialize};

use super::Actor;
use crate::values::{MessageId, Timestamp, UserId};

/// Emoji reactions a user may put on a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    #[serde(rename = "😂")]
    Laugh,
    #[serde(rename = "😮")]
    Surprise,
    #[serde(rename = "😢")]
    Sad,
    #[serde(rename = "❤️")]
    Love,
    #[serde(rename = "😉")]
    Wink,
    #[serde(rename = "😠")]
    Angry,
    #[serde(rename = "🤔")]
    Think,
    #[serde(rename = "👏")]
    Clap,
    #[serde(rename = "👍")]
    ThumbsUp,
    #[serde(rename = "👎")]
    ThumbsDown,
}

impl Reaction {
    pub const ALL: [Reaction; 10] = [
        Reaction::Laugh,
        Reaction::Surprise,
        Reaction::Sad,
        Reaction::Love,
        Reaction::Wink,
        Reaction::Angry,
        Reaction::Think,
        Reaction::Clap,
        Reaction::ThumbsUp,
        Reaction::ThumbsDown,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Reaction::Laugh => "😂",
            Reaction::Surprise => "😮",
            Reaction::Sad => "😢",
            Reaction::Love => "❤️",
            Reaction::Wink => "😉",
            Reaction::Angry => "😠",
            Reaction::Think => "🤔",
            Reaction::Clap => "👏",
            Reaction::ThumbsUp => "👍",
            Reaction::ThumbsDown => "👎",
        }
    }

    /// Parse a wire symbol. An empty string means "no reaction".
    ///
    /// Returns `Err(())` for anything outside the reaction set.
    #[allow(clippy::result_unit_err)]
    pub fn from_symbol(symbol: &str) -> Result<Option<Reaction>, ()> {
        if symbol.is_empty() {
            return Ok(None);
        }
        Self::ALL
            .iter()
            .find(|r| r.symbol() == symbol)
            .copied()
            .map(Some)
            .ok_or(())
    }
}

/// Frozen copy of the author at the time of writing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshot {
    pub user_id: UserId,
    pub username: String,
}

impl From<&Actor> for AuthorSnapshot {
    fn from(actor: &Actor) -> Self {
        Self {
            user_id: actor.user_id,
            username: actor.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReaction {
    pub reaction: Reaction,
    pub user: AuthorSnapshot,
    pub reacted_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: AuthorSnapshot,
    pub text: String,
    pub created_at: Timestamp,
    /// At most one entry per user
    pub reactions: Vec<MessageReaction>,
}

impl ChatMessage {
    pub fn reaction_of(&self, user_id: UserId) -> Option<&MessageReaction> {
        self.reactions.iter().find(|r| r.user.user_id == user_id)
    }
}

/// Counters kept next to the message log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub total_messages: u64,
    pub seller_unread: u64,
    pub buyer_unread: u64,
    pub last_message_at: Option<Timestamp>,
}
