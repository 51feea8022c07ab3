use dealroom_cache::WriteBackCache;
use dealroom_core::{DealEvent, DealId, MessageId, MessageView, Reaction};
use dealroom_lifecycle::{ReactionChange, ReactionOutcome, append_message, set_reaction};
use dealroom_ports::{Clock, EventSink};
use log::{debug, info};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{DealError, DealResult};

/// Chat log and reactions of a deal room
pub struct ChatService {
    cache: Arc<WriteBackCache>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(cache: Arc<WriteBackCache>, events: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            events,
            clock,
        }
    }

    pub async fn add_message(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        text: &str,
    ) -> DealResult<MessageView> {
        let now = self.clock.now();
        let author = &ctx.actor;
        let message = self
            .cache
            .mutate(deal_id, |deal| {
                append_message(deal, author, text, now).map_err(DealError::from)
            })
            .await?;

        info!(
            "Message added request_id={} deal_id={} user_id={} message_id={}",
            ctx.request_id, deal_id, author.user_id, message.id
        );
        let view = MessageView { deal_id, message };
        self.events.emit(DealEvent::MessageAdded(view.clone()));
        Ok(view)
    }

    /// Put, replace or (with `None`) remove the caller's reaction
    pub async fn set_reaction(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        message_id: MessageId,
        reaction: Option<Reaction>,
    ) -> DealResult<ReactionOutcome> {
        let now = self.clock.now();
        let actor = &ctx.actor;
        let outcome = self
            .cache
            .mutate_with(deal_id, |deal| {
                let outcome = set_reaction(deal, actor, message_id, reaction, now)?;
                let changed = outcome.change != ReactionChange::Unchanged;
                Ok::<_, DealError>((outcome, changed))
            })
            .await?;

        let view = MessageView {
            deal_id,
            message: outcome.message.clone(),
        };
        match outcome.change {
            ReactionChange::Added | ReactionChange::Replaced => {
                self.events.emit(DealEvent::ReactionAdded(view))
            }
            ReactionChange::Removed => self.events.emit(DealEvent::ReactionRemoved(view)),
            ReactionChange::Unchanged => {}
        }
        debug!(
            "Reaction set request_id={} deal_id={} message_id={} change={:?}",
            ctx.request_id, deal_id, message_id, outcome.change
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use dealroom_core::Actor;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_message_ids_increase_and_unread_counts_follow_author() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;

        let first = h
            .chat
            .add_message(&h.seller_ctx(&deal), deal.id, "  hello  ")
            .await
            .unwrap();
        let second = h
            .chat
            .add_message(&h.buyer_ctx(&deal), deal.id, "hi")
            .await
            .unwrap();

        assert_eq!(first.message.id, 1);
        assert_eq!(first.message.text, "hello");
        assert_eq!(second.message.id, 2);
        let cached = h.cache.peek(deal.id).unwrap();
        assert_eq!(cached.chat.total_messages, 2);
        assert_eq!(cached.chat.buyer_unread, 1);
        assert_eq!(cached.chat.seller_unread, 1);
        assert_eq!(h.events.count("deal.message.added"), 2);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;

        let err = h
            .chat
            .add_message(&h.seller_ctx(&deal), deal.id, "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, DealError::Validation(_)));
        assert_eq!(h.events.count("deal.message.added"), 0);
    }

    #[tokio::test]
    async fn test_outsider_cannot_post() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;
        let outsider = RequestContext::new(Actor::new(Uuid::new_v4(), "eve"));

        let err = h.chat.add_message(&outsider, deal.id, "hey").await.unwrap_err();

        assert!(matches!(err, DealError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_reaction_toggle_emits_matching_events() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;
        let buyer = h.buyer_ctx(&deal);
        let message = h
            .chat
            .add_message(&h.seller_ctx(&deal), deal.id, "shipped")
            .await
            .unwrap()
            .message;

        let added = h
            .chat
            .set_reaction(&buyer, deal.id, message.id, Some(Reaction::ThumbsUp))
            .await
            .unwrap();
        let replaced = h
            .chat
            .set_reaction(&buyer, deal.id, message.id, Some(Reaction::Love))
            .await
            .unwrap();
        let unchanged = h
            .chat
            .set_reaction(&buyer, deal.id, message.id, Some(Reaction::Love))
            .await
            .unwrap();
        let removed = h
            .chat
            .set_reaction(&buyer, deal.id, message.id, None)
            .await
            .unwrap();

        assert_eq!(added.change, ReactionChange::Added);
        assert_eq!(replaced.change, ReactionChange::Replaced);
        assert_eq!(replaced.message.reactions.len(), 1);
        assert_eq!(unchanged.change, ReactionChange::Unchanged);
        assert_eq!(removed.change, ReactionChange::Removed);
        assert!(removed.message.reactions.is_empty());
        assert_eq!(h.events.count("deal.reaction.added"), 2);
        assert_eq!(h.events.count("deal.reaction.removed"), 1);
    }

    #[tokio::test]
    async fn test_unchanged_reaction_leaves_entry_clean() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;
        let buyer = h.buyer_ctx(&deal);
        let message = h
            .chat
            .add_message(&h.seller_ctx(&deal), deal.id, "shipped")
            .await
            .unwrap()
            .message;
        h.chat
            .set_reaction(&buyer, deal.id, message.id, Some(Reaction::Think))
            .await
            .unwrap();

        let synced = h.cache.status(deal.id).unwrap().revision;
        assert!(h.cache.mark_synced(deal.id, synced));

        let outcome = h
            .chat
            .set_reaction(&buyer, deal.id, message.id, Some(Reaction::Think))
            .await
            .unwrap();
        assert_eq!(outcome.change, ReactionChange::Unchanged);
        let status = h.cache.status(deal.id).unwrap();
        assert!(!status.dirty);
        assert_eq!(status.revision, synced);
        assert!(h.cache.changed().is_empty());
    }

    #[tokio::test]
    async fn test_reaction_on_missing_message_is_not_found() {
        let h = Harness::new();
        let deal = h.seed_direct(1).await;

        let err = h
            .chat
            .set_reaction(&h.buyer_ctx(&deal), deal.id, 42, Some(Reaction::Clap))
            .await
            .unwrap_err();

        assert!(matches!(err, DealError::NotFound(_)));
    }
}
