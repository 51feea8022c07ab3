use dealroom_core::CounterOfferId;
use rust_decimal::Decimal;

/// Participant-initiated step in a deal's lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Start,
    ConfirmPayment { note: Option<String> },
    ConfirmDelivery { note: Option<String> },
    ConfirmAcceptance { note: Option<String> },
    Close,
    Cancel,
    OpenDispute { reason: String },
    CreateCounterOffer {
        price: Decimal,
        message: Option<String>,
    },
    RespondCounterOffer {
        counter_offer_id: CounterOfferId,
        accept: bool,
    },
}

impl Transition {
    pub fn action(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::ConfirmPayment { .. } => "confirm payment",
            Transition::ConfirmDelivery { .. } => "confirm delivery",
            Transition::ConfirmAcceptance { .. } => "confirm acceptance",
            Transition::Close => "close",
            Transition::Cancel => "cancel",
            Transition::OpenDispute { .. } => "open a dispute",
            Transition::CreateCounterOffer { .. } => "create a counter offer",
            Transition::RespondCounterOffer { .. } => "respond to a counter offer",
        }
    }
}

/// What the caller must do after a transition was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Publish the updated deal
    Changed,
    /// Publish the updated deal, then run the one-off finish effects
    Finished,
    /// Publish the updated deal and tell both participants
    Cancelled,
}
