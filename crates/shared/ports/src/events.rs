use async_trait::async_trait;
use dealroom_core::{Deal, DealEvent, DealId, UserId, UserNotice};

use crate::error::{DeliveryError, ValidationError};

/// Receives domain events after a deal changes
///
/// Called synchronously by the services; implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DealEvent);
}

/// Records sales figures for a finished deal
#[async_trait]
pub trait StatsRecorder: Send + Sync {
    async fn record_deal(&self, deal: &Deal) -> Result<(), DeliveryError>;
}

/// Dispatches personal notifications (push, email, in-app)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: UserId, notice: UserNotice) -> Result<(), DeliveryError>;
}

/// Decides whether a user may stay connected to a deal
#[async_trait]
pub trait ParticipantValidator: Send + Sync {
    async fn validate(&self, deal_id: DealId, user_id: UserId) -> Result<bool, ValidationError>;
}
