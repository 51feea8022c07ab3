//! Chat rules for the deal's message log

use dealroom_core::{
    Actor, AuthorSnapshot, ChatMessage, Deal, MessageId, MessageReaction, Participant, Reaction,
    Timestamp,
};

use crate::error::{TransitionError, TransitionResult};

/// Longest accepted message, in characters, after trimming
pub const MAX_MESSAGE_LEN: usize = 255;

/// How a reaction request changed the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Replaced,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionOutcome {
    pub change: ReactionChange,
    pub message: ChatMessage,
}

/// Append a message from a participant (or staff) to the deal's log
pub fn append_message(
    deal: &mut Deal,
    author: &Actor,
    text: &str,
    now: Timestamp,
) -> TransitionResult<ChatMessage> {
    let side = require_chat_access(deal, author)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(TransitionError::Validation(
            "message text must not be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(TransitionError::Validation(format!(
            "message text must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let message = ChatMessage {
        id: deal.next_message_id(),
        author: AuthorSnapshot::from(author),
        text: text.to_string(),
        created_at: now,
        reactions: Vec::new(),
    };
    deal.messages.push(message.clone());

    deal.chat.total_messages += 1;
    deal.chat.last_message_at = Some(now);
    match side {
        Some(Participant::Seller) => deal.chat.buyer_unread += 1,
        Some(Participant::Buyer) => deal.chat.seller_unread += 1,
        None => {
            deal.chat.buyer_unread += 1;
            deal.chat.seller_unread += 1;
        }
    }
    deal.updated_at = now;
    Ok(message)
}

/// Put, replace or remove (`None`) the actor's reaction on a message
pub fn set_reaction(
    deal: &mut Deal,
    actor: &Actor,
    message_id: MessageId,
    reaction: Option<Reaction>,
    now: Timestamp,
) -> TransitionResult<ReactionOutcome> {
    require_chat_access(deal, actor)?;
    let message = deal
        .message_mut(message_id)
        .ok_or_else(|| TransitionError::NotFound(format!("message {message_id}")))?;

    let existing = message
        .reactions
        .iter()
        .position(|r| r.user.user_id == actor.user_id);

    let change = match (existing, reaction) {
        (None, None) => ReactionChange::Unchanged,
        (Some(index), None) => {
            message.reactions.remove(index);
            ReactionChange::Removed
        }
        (Some(index), Some(reaction)) if message.reactions[index].reaction == reaction => {
            ReactionChange::Unchanged
        }
        (Some(index), Some(reaction)) => {
            let entry = &mut message.reactions[index];
            entry.reaction = reaction;
            entry.reacted_at = now;
            ReactionChange::Replaced
        }
        (None, Some(reaction)) => {
            message.reactions.push(MessageReaction {
                reaction,
                user: AuthorSnapshot::from(actor),
                reacted_at: now,
            });
            ReactionChange::Added
        }
    };

    let message = message.clone();
    if change != ReactionChange::Unchanged {
        deal.updated_at = now;
    }
    Ok(ReactionOutcome { change, message })
}

/// Participants and admins may use the chat; admins have no side
fn require_chat_access(deal: &Deal, actor: &Actor) -> TransitionResult<Option<Participant>> {
    match deal.participant(actor.user_id) {
        Some(side) => Ok(Some(side)),
        None if actor.is_admin() => Ok(None),
        None => Err(TransitionError::Forbidden(
            "only deal participants can use the chat".to_string(),
        )),
    }
}
