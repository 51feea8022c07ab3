//! Client → server events

use dealroom_core::{CounterOfferId, DealId, MessageId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inbound action from a connected client
///
/// Wire shape: `{"event": "deal.start", "data": {"dealId": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    #[serde(rename = "sendMessage")]
    SendMessage { deal_id: DealId, text: String },

    /// An empty `reaction` removes the sender's reaction
    #[serde(rename = "addReaction")]
    AddReaction {
        deal_id: DealId,
        message_id: MessageId,
        #[serde(default)]
        reaction: String,
    },

    #[serde(rename = "deal.start")]
    Start { deal_id: DealId },

    #[serde(rename = "deal.buyerConfirmPayment")]
    ConfirmPayment {
        deal_id: DealId,
        #[serde(default)]
        note: Option<String>,
    },

    #[serde(rename = "deal.sellerConfirmDelivery")]
    ConfirmDelivery {
        deal_id: DealId,
        #[serde(default)]
        note: Option<String>,
    },

    #[serde(rename = "deal.buyerConfirmAcceptance")]
    ConfirmAcceptance {
        deal_id: DealId,
        #[serde(default)]
        note: Option<String>,
    },

    #[serde(rename = "deal.close")]
    Close { deal_id: DealId },

    #[serde(rename = "deal.cancel")]
    Cancel { deal_id: DealId },

    #[serde(rename = "deal.dispute")]
    Dispute { deal_id: DealId, reason: String },

    #[serde(rename = "deal.counterOffer")]
    CounterOffer {
        deal_id: DealId,
        price: Decimal,
        #[serde(default)]
        message: Option<String>,
    },

    #[serde(rename = "deal.counterOfferRespond")]
    CounterOfferRespond {
        deal_id: DealId,
        counter_offer_id: CounterOfferId,
        accept: bool,
    },
}

impl ClientEvent {
    pub fn deal_id(&self) -> DealId {
        match self {
            ClientEvent::SendMessage { deal_id, .. }
            | ClientEvent::AddReaction { deal_id, .. }
            | ClientEvent::Start { deal_id }
            | ClientEvent::ConfirmPayment { deal_id, .. }
            | ClientEvent::ConfirmDelivery { deal_id, .. }
            | ClientEvent::ConfirmAcceptance { deal_id, .. }
            | ClientEvent::Close { deal_id }
            | ClientEvent::Cancel { deal_id }
            | ClientEvent::Dispute { deal_id, .. }
            | ClientEvent::CounterOffer { deal_id, .. }
            | ClientEvent::CounterOfferRespond { deal_id, .. } => *deal_id,
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage { .. } => "sendMessage",
            ClientEvent::AddReaction { .. } => "addReaction",
            ClientEvent::Start { .. } => "deal.start",
            ClientEvent::ConfirmPayment { .. } => "deal.buyerConfirmPayment",
            ClientEvent::ConfirmDelivery { .. } => "deal.sellerConfirmDelivery",
            ClientEvent::ConfirmAcceptance { .. } => "deal.buyerConfirmAcceptance",
            ClientEvent::Close { .. } => "deal.close",
            ClientEvent::Cancel { .. } => "deal.cancel",
            ClientEvent::Dispute { .. } => "deal.dispute",
            ClientEvent::CounterOffer { .. } => "deal.counterOffer",
            ClientEvent::CounterOfferRespond { .. } => "deal.counterOfferRespond",
        }
    }
}
