use serde::{Deserialize, Serialize};

use crate::values::{Timestamp, UserId};

/// Platform guarantee settings of a deal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guarantee {
    pub enabled: bool,
    pub initiated_by: Option<UserId>,
    pub seller_approved: bool,
    pub buyer_approved: bool,
    pub seller_approved_at: Option<Timestamp>,
    pub buyer_approved_at: Option<Timestamp>,
    /// Deadline after which the expiry sweep finishes the deal
    pub auto_cancel_at: Option<Timestamp>,
}

/// One side's confirmation of a handover step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub done: bool,
    pub done_at: Option<Timestamp>,
    pub confirmed_by: Option<UserId>,
    pub note: Option<String>,
}

impl Confirmation {
    pub fn record(&mut self, by: UserId, note: Option<String>, at: Timestamp) {
        self.done = true;
        self.done_at = Some(at);
        self.confirmed_by = Some(by);
        self.note = note;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Confirmations {
    pub buyer: Confirmation,
    pub seller: Confirmation,
}

/// Dispute raised by a participant, resolved by staff
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub is_open: bool,
    pub reason: Option<String>,
    pub opened_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub resolution: Option<String>,
    pub opened_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
}
