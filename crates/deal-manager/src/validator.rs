use async_trait::async_trait;
use dealroom_cache::{CacheError, WriteBackCache};
use dealroom_core::{DealId, DealStatus, UserId};
use dealroom_ports::{ParticipantValidator, ValidationError};
use log::debug;
use std::sync::Arc;

/// Checks that a connected user still belongs in a deal room
///
/// The user must be the seller or the buyer, and the deal must not have
/// been cancelled. A deal that no longer exists fails the check.
pub struct DealParticipantValidator {
    cache: Arc<WriteBackCache>,
}

impl DealParticipantValidator {
    pub fn new(cache: Arc<WriteBackCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ParticipantValidator for DealParticipantValidator {
    async fn validate(&self, deal_id: DealId, user_id: UserId) -> Result<bool, ValidationError> {
        let deal = match self.cache.get(deal_id).await {
            Ok(deal) => deal,
            Err(CacheError::NotFound(_)) => return Ok(false),
            Err(CacheError::Store(err)) => return Err(ValidationError::Lookup(err.to_string())),
        };

        let valid = deal.is_participant(user_id) && deal.status != DealStatus::Cancelled;
        if !valid {
            debug!(
                "Participant check failed deal_id={} user_id={} status={}",
                deal_id, user_id, deal.status
            );
        }
        Ok(valid)
    }
}
