use dealroom_core::{
    Actor, CounterOffer, CounterOfferStatus, Deal, DealStatus, ItemStatus, Participant,
    TimelineEntry, TimelineKind, Timestamp, UserId,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::error::{TransitionError, TransitionResult};
use crate::transition::{Effect, Transition};

/// Deal lifecycle state machine
///
/// ```text
/// pending_seller ──start──► active ─────────────────────────────┐
///        │                                                      │
///        └──start (guaranteed)──► awaiting_payment              │
///                                      │ buyer pays             │
///                                      ▼                        │
///                              awaiting_delivery                │
///                                      │ seller delivers        │
///                                      ▼                        │
///                             awaiting_acceptance               │
///                                      │ buyer accepts          │
///                                      ▼                        ▼
///                               ready_to_close ──close──► ended
///
/// cancel / dispute: side branches from non-terminal states
/// ```
///
/// Every check runs before the first write, so a rejected transition
/// leaves the deal untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DealStateMachine;

impl DealStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Apply a participant action to the deal
    pub fn apply(
        &self,
        deal: &mut Deal,
        actor: &Actor,
        transition: Transition,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        let user = actor.user_id;
        match transition {
            Transition::Start => self.start(deal, user, now),
            Transition::ConfirmPayment { note } => self.confirm_payment(deal, user, note, now),
            Transition::ConfirmDelivery { note } => self.confirm_delivery(deal, user, note, now),
            Transition::ConfirmAcceptance { note } => {
                self.confirm_acceptance(deal, user, note, now)
            }
            Transition::Close => self.close(deal, user, now),
            Transition::Cancel => self.cancel(deal, user, now),
            Transition::OpenDispute { reason } => self.open_dispute(deal, user, reason, now),
            Transition::CreateCounterOffer { price, message } => {
                self.create_counter_offer(deal, user, price, message, now)
            }
            Transition::RespondCounterOffer {
                counter_offer_id,
                accept,
            } => self.respond_counter_offer(deal, user, counter_offer_id, accept, now),
        }
    }

    /// Finish a deal whose auto-cancel deadline has passed
    ///
    /// Runs on behalf of the scheduler, so no actor is checked.
    pub fn finish_expired(&self, deal: &mut Deal, now: Timestamp) -> TransitionResult<Effect> {
        if deal.status.is_terminal() || deal.status == DealStatus::Dispute {
            return Err(TransitionError::wrong_status("finish", deal.status));
        }

        deal.status = DealStatus::Ended;
        deal.ended_at.get_or_insert(now);
        record(deal, TimelineEntry::new(TimelineKind::DealExpired, None, now));
        Ok(Effect::Finished)
    }

    fn start(&self, deal: &mut Deal, user: UserId, now: Timestamp) -> TransitionResult<Effect> {
        require_seller(deal, user, "start the deal")?;
        if deal.status != DealStatus::PendingSeller {
            return Err(TransitionError::wrong_status("start", deal.status));
        }

        deal.started_at = Some(now);
        deal.status = if deal.is_guaranteed() {
            DealStatus::AwaitingPayment
        } else {
            DealStatus::Active
        };
        record(deal, TimelineEntry::new(TimelineKind::DealStarted, Some(user), now));
        Ok(Effect::Changed)
    }

    fn confirm_payment(
        &self,
        deal: &mut Deal,
        user: UserId,
        note: Option<String>,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_buyer(deal, user, "confirm payment")?;
        if deal.status != DealStatus::AwaitingPayment || !deal.is_guaranteed() {
            return Err(TransitionError::wrong_status("confirm payment", deal.status));
        }

        deal.confirmations.buyer.record(user, note.clone(), now);
        deal.paid_at = Some(now);
        deal.status = DealStatus::AwaitingDelivery;
        record(deal, noted(TimelineKind::PaymentConfirmed, user, note, now));
        Ok(Effect::Changed)
    }

    fn confirm_delivery(
        &self,
        deal: &mut Deal,
        user: UserId,
        note: Option<String>,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_seller(deal, user, "confirm delivery")?;
        if deal.status != DealStatus::AwaitingDelivery {
            return Err(TransitionError::wrong_status("confirm delivery", deal.status));
        }

        deal.confirmations.seller.record(user, note.clone(), now);
        move_items(deal, ItemStatus::Pending, ItemStatus::Delivered);
        deal.status = DealStatus::AwaitingAcceptance;
        record(deal, noted(TimelineKind::DeliveryConfirmed, user, note, now));
        Ok(Effect::Changed)
    }

    fn confirm_acceptance(
        &self,
        deal: &mut Deal,
        user: UserId,
        note: Option<String>,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_buyer(deal, user, "confirm acceptance")?;
        if deal.status != DealStatus::AwaitingAcceptance {
            return Err(TransitionError::wrong_status("confirm acceptance", deal.status));
        }

        move_items(deal, ItemStatus::Delivered, ItemStatus::Accepted);
        deal.status = DealStatus::ReadyToClose;
        record(deal, noted(TimelineKind::AcceptanceConfirmed, user, note, now));
        Ok(Effect::Changed)
    }

    fn close(&self, deal: &mut Deal, user: UserId, now: Timestamp) -> TransitionResult<Effect> {
        require_seller(deal, user, "close the deal")?;
        if !deal.status.is_closable() {
            return Err(TransitionError::wrong_status("close", deal.status));
        }

        deal.status = DealStatus::Ended;
        deal.ended_at = Some(now);
        record(deal, TimelineEntry::new(TimelineKind::DealClosed, Some(user), now));
        Ok(Effect::Finished)
    }

    fn cancel(&self, deal: &mut Deal, user: UserId, now: Timestamp) -> TransitionResult<Effect> {
        let side = require_participant(deal, user, "cancel the deal")?;
        if deal.status.is_terminal() {
            return Err(TransitionError::wrong_status("cancel", deal.status));
        }
        if deal.is_guaranteed() && deal.status != DealStatus::PendingSeller {
            return Err(TransitionError::InvalidTransition(
                "a guaranteed deal cannot be cancelled once started".to_string(),
            ));
        }

        for item in deal.items.iter_mut() {
            if item.status != ItemStatus::Accepted {
                item.status = ItemStatus::Cancelled;
            }
        }
        deal.status = DealStatus::Cancelled;
        deal.ended_at = Some(now);
        record(
            deal,
            TimelineEntry::new(TimelineKind::DealCancelled, Some(user), now)
                .with_payload(json!({ "by": side.as_str() })),
        );
        Ok(Effect::Cancelled)
    }

    fn open_dispute(
        &self,
        deal: &mut Deal,
        user: UserId,
        reason: String,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_participant(deal, user, "open a dispute")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TransitionError::Validation(
                "dispute reason must not be empty".to_string(),
            ));
        }
        if deal.status == DealStatus::Dispute {
            return Err(TransitionError::InvalidTransition(
                "a dispute is already open".to_string(),
            ));
        }
        if deal.status.is_terminal() {
            return Err(TransitionError::wrong_status("open a dispute", deal.status));
        }

        deal.dispute.is_open = true;
        deal.dispute.reason = Some(reason.to_string());
        deal.dispute.opened_by = Some(user);
        deal.dispute.opened_at = Some(now);
        deal.status = DealStatus::Dispute;
        record(
            deal,
            TimelineEntry::new(TimelineKind::DisputeOpened, Some(user), now)
                .with_payload(json!({ "reason": reason })),
        );
        Ok(Effect::Changed)
    }

    fn create_counter_offer(
        &self,
        deal: &mut Deal,
        user: UserId,
        price: Decimal,
        message: Option<String>,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_participant(deal, user, "create a counter offer")?;
        if matches!(
            deal.status,
            DealStatus::Cancelled | DealStatus::Ended | DealStatus::Dispute
        ) {
            return Err(TransitionError::wrong_status(
                "create a counter offer",
                deal.status,
            ));
        }
        if price <= Decimal::ZERO {
            return Err(TransitionError::Validation(
                "counter offer price must be positive".to_string(),
            ));
        }

        deal.counter_offers.push(CounterOffer {
            id: Uuid::new_v4(),
            author: user,
            price,
            status: CounterOfferStatus::Pending,
            message: message.filter(|m| !m.trim().is_empty()),
            created_at: now,
            updated_at: now,
        });
        record(
            deal,
            TimelineEntry::new(TimelineKind::CounterOfferCreated, Some(user), now)
                .with_payload(json!({ "price": price })),
        );
        Ok(Effect::Changed)
    }

    fn respond_counter_offer(
        &self,
        deal: &mut Deal,
        user: UserId,
        counter_offer_id: Uuid,
        accept: bool,
        now: Timestamp,
    ) -> TransitionResult<Effect> {
        require_participant(deal, user, "respond to a counter offer")?;
        if deal.status.is_terminal() {
            return Err(TransitionError::wrong_status(
                "respond to a counter offer",
                deal.status,
            ));
        }
        let offer = deal.counter_offer(counter_offer_id).ok_or_else(|| {
            TransitionError::NotFound(format!("counter offer {counter_offer_id}"))
        })?;
        if offer.author == user {
            return Err(TransitionError::Forbidden(
                "the author cannot respond to their own counter offer".to_string(),
            ));
        }
        if !offer.is_pending() {
            return Err(TransitionError::InvalidTransition(
                "counter offer has already been handled".to_string(),
            ));
        }
        let price = offer.price;

        if let Some(offer) = deal.counter_offer_mut(counter_offer_id) {
            offer.status = if accept {
                CounterOfferStatus::Accepted
            } else {
                CounterOfferStatus::Declined
            };
            offer.updated_at = now;
        }
        if accept {
            deal.final_price = Some(price);
            let share = price / Decimal::from(deal.items.len().max(1));
            for item in deal.items.iter_mut() {
                item.price = share;
            }
        }
        record(
            deal,
            TimelineEntry::new(TimelineKind::CounterOfferResponded, Some(user), now)
                .with_payload(json!({ "counterOfferId": counter_offer_id, "accept": accept })),
        );
        Ok(Effect::Changed)
    }
}

fn require_seller(deal: &Deal, user: UserId, what: &str) -> TransitionResult<()> {
    if deal.seller_id != user {
        return Err(TransitionError::Forbidden(format!(
            "only the seller can {what}"
        )));
    }
    Ok(())
}

fn require_buyer(deal: &Deal, user: UserId, what: &str) -> TransitionResult<()> {
    if deal.buyer_id != Some(user) {
        return Err(TransitionError::Forbidden(format!(
            "only the buyer can {what}"
        )));
    }
    Ok(())
}

fn require_participant(deal: &Deal, user: UserId, what: &str) -> TransitionResult<Participant> {
    deal.participant(user).ok_or_else(|| {
        TransitionError::Forbidden(format!("only deal participants can {what}"))
    })
}

fn move_items(deal: &mut Deal, from: ItemStatus, to: ItemStatus) {
    for item in deal.items.iter_mut().filter(|item| item.status == from) {
        item.status = to;
    }
}

fn noted(kind: TimelineKind, user: UserId, note: Option<String>, now: Timestamp) -> TimelineEntry {
    let entry = TimelineEntry::new(kind, Some(user), now);
    match note {
        Some(note) => entry.with_payload(json!({ "note": note })),
        None => entry,
    }
}

fn record(deal: &mut Deal, entry: TimelineEntry) {
    deal.updated_at = entry.at;
    deal.timeline.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{deal, parties};
    use chrono::Utc;
    use dealroom_core::DealMode;
    use rust_decimal_macros::dec;

    fn run(
        deal: &mut Deal,
        actor: &Actor,
        transition: Transition,
    ) -> TransitionResult<Effect> {
        DealStateMachine::new().apply(deal, actor, transition, Utc::now())
    }

    #[test]
    fn test_guaranteed_happy_path() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Guaranteed, 1);

        run(&mut deal, &p.seller, Transition::Start).unwrap();
        assert_eq!(deal.status, DealStatus::AwaitingPayment);
        assert!(deal.started_at.is_some());

        run(
            &mut deal,
            &p.buyer,
            Transition::ConfirmPayment {
                note: Some("wired".to_string()),
            },
        )
        .unwrap();
        assert_eq!(deal.status, DealStatus::AwaitingDelivery);
        assert!(deal.confirmations.buyer.done);
        assert_eq!(deal.confirmations.buyer.confirmed_by, Some(p.buyer.user_id));
        assert!(deal.paid_at.is_some());

        run(&mut deal, &p.seller, Transition::ConfirmDelivery { note: None }).unwrap();
        assert_eq!(deal.status, DealStatus::AwaitingAcceptance);
        assert_eq!(deal.items[0].status, ItemStatus::Delivered);

        run(&mut deal, &p.buyer, Transition::ConfirmAcceptance { note: None }).unwrap();
        assert_eq!(deal.status, DealStatus::ReadyToClose);
        assert_eq!(deal.items[0].status, ItemStatus::Accepted);

        let effect = run(&mut deal, &p.seller, Transition::Close).unwrap();
        assert_eq!(effect, Effect::Finished);
        assert_eq!(deal.status, DealStatus::Ended);
        assert!(deal.ended_at.is_some());

        let kinds: Vec<_> = deal.timeline.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineKind::DealStarted,
                TimelineKind::PaymentConfirmed,
                TimelineKind::DeliveryConfirmed,
                TimelineKind::AcceptanceConfirmed,
                TimelineKind::DealClosed,
            ]
        );
    }

    #[test]
    fn test_direct_deal_starts_active_and_closes() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 1);

        run(&mut deal, &p.seller, Transition::Start).unwrap();
        assert_eq!(deal.status, DealStatus::Active);
        assert_eq!(
            run(&mut deal, &p.seller, Transition::Close),
            Ok(Effect::Finished)
        );
    }

    #[test]
    fn test_close_from_pending_seller_is_invalid_and_leaves_deal_untouched() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 1);
        let before = deal.clone();

        let err = run(&mut deal, &p.seller, Transition::Close).unwrap_err();

        assert!(matches!(err, TransitionError::InvalidTransition(_)));
        assert_eq!(deal, before);
    }

    #[test]
    fn test_illegal_steps_along_the_guaranteed_path_are_rejected() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Guaranteed, 1);

        let illegal = |deal: &mut Deal| {
            let status = deal.status;
            for (actor, transition) in [
                (&p.buyer, Transition::ConfirmAcceptance { note: None }),
                (&p.seller, Transition::ConfirmDelivery { note: None }),
            ] {
                if let Err(err) = run(deal, actor, transition) {
                    assert!(matches!(err, TransitionError::InvalidTransition(_)));
                    assert_eq!(deal.status, status);
                }
            }
        };

        illegal(&mut deal);
        run(&mut deal, &p.seller, Transition::Start).unwrap();
        illegal(&mut deal);
        assert_eq!(deal.status, DealStatus::AwaitingPayment);
        assert!(matches!(
            run(&mut deal, &p.seller, Transition::Close),
            Err(TransitionError::InvalidTransition(_))
        ));
        assert!(matches!(
            run(&mut deal, &p.seller, Transition::Start),
            Err(TransitionError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_payment_confirmation_requires_guarantee() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 1);
        run(&mut deal, &p.seller, Transition::Start).unwrap();
        deal.status = DealStatus::AwaitingPayment;

        let err = run(&mut deal, &p.buyer, Transition::ConfirmPayment { note: None }).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition(_)));
    }

    #[test]
    fn test_wrong_actor_is_forbidden() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Guaranteed, 1);

        assert!(matches!(
            run(&mut deal, &p.buyer, Transition::Start),
            Err(TransitionError::Forbidden(_))
        ));
        run(&mut deal, &p.seller, Transition::Start).unwrap();
        assert!(matches!(
            run(&mut deal, &p.seller, Transition::ConfirmPayment { note: None }),
            Err(TransitionError::Forbidden(_))
        ));
        assert!(matches!(
            run(&mut deal, &p.stranger, Transition::Cancel),
            Err(TransitionError::Forbidden(_))
        ));
    }

    #[test]
    fn test_cancel_rules() {
        let p = parties();

        let mut direct = deal(&p, DealMode::Direct, 2);
        run(&mut direct, &p.seller, Transition::Start).unwrap();
        assert_eq!(run(&mut direct, &p.buyer, Transition::Cancel), Ok(Effect::Cancelled));
        assert_eq!(direct.status, DealStatus::Cancelled);
        assert!(direct.ended_at.is_some());
        assert!(direct.items.iter().all(|i| i.status == ItemStatus::Cancelled));
        assert_eq!(
            direct.timeline.last().and_then(|e| e.payload.clone()),
            Some(json!({ "by": "buyer" }))
        );
        assert!(matches!(
            run(&mut direct, &p.seller, Transition::Cancel),
            Err(TransitionError::InvalidTransition(_))
        ));

        let mut guaranteed = deal(&p, DealMode::Guaranteed, 1);
        run(&mut guaranteed, &p.seller, Transition::Start).unwrap();
        assert!(matches!(
            run(&mut guaranteed, &p.buyer, Transition::Cancel),
            Err(TransitionError::InvalidTransition(_))
        ));
        assert_eq!(guaranteed.status, DealStatus::AwaitingPayment);

        let mut unguarded = deal(&p, DealMode::Guaranteed, 1);
        unguarded.guarantee.enabled = false;
        run(&mut unguarded, &p.seller, Transition::Start).unwrap();
        assert_eq!(unguarded.status, DealStatus::Active);
        assert_eq!(run(&mut unguarded, &p.buyer, Transition::Cancel), Ok(Effect::Cancelled));
        assert_eq!(unguarded.status, DealStatus::Cancelled);
    }

    #[test]
    fn test_dispute_can_only_be_opened_once() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Guaranteed, 1);
        run(&mut deal, &p.seller, Transition::Start).unwrap();

        let dispute = || Transition::OpenDispute {
            reason: " item never arrived ".to_string(),
        };
        run(&mut deal, &p.buyer, dispute()).unwrap();
        assert_eq!(deal.status, DealStatus::Dispute);
        assert!(deal.dispute.is_open);
        assert_eq!(deal.dispute.reason.as_deref(), Some("item never arrived"));
        assert_eq!(deal.dispute.opened_by, Some(p.buyer.user_id));

        assert!(matches!(
            run(&mut deal, &p.seller, dispute()),
            Err(TransitionError::InvalidTransition(_))
        ));
        assert!(matches!(
            run(
                &mut deal,
                &p.seller,
                Transition::OpenDispute {
                    reason: "  ".to_string()
                }
            ),
            Err(TransitionError::Validation(_))
        ));
    }

    #[test]
    fn test_accepting_counter_offer_redistributes_price() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 2);

        run(
            &mut deal,
            &p.buyer,
            Transition::CreateCounterOffer {
                price: dec!(150),
                message: Some("how about this".to_string()),
            },
        )
        .unwrap();
        assert_eq!(deal.status, DealStatus::PendingSeller);
        let offer_id = deal.counter_offers[0].id;
        assert!(deal.counter_offers[0].is_pending());

        run(
            &mut deal,
            &p.seller,
            Transition::RespondCounterOffer {
                counter_offer_id: offer_id,
                accept: true,
            },
        )
        .unwrap();

        assert_eq!(deal.final_price, Some(dec!(150)));
        assert!(deal.items.iter().all(|item| item.price == dec!(75)));
        assert_eq!(deal.counter_offers[0].status, CounterOfferStatus::Accepted);
    }

    #[test]
    fn test_counter_offer_response_rules() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 1);
        run(
            &mut deal,
            &p.buyer,
            Transition::CreateCounterOffer {
                price: dec!(80),
                message: None,
            },
        )
        .unwrap();
        let offer_id = deal.counter_offers[0].id;
        let respond = |accept| Transition::RespondCounterOffer {
            counter_offer_id: offer_id,
            accept,
        };

        assert!(matches!(
            run(&mut deal, &p.buyer, respond(true)),
            Err(TransitionError::Forbidden(_))
        ));
        assert!(matches!(
            run(
                &mut deal,
                &p.seller,
                Transition::RespondCounterOffer {
                    counter_offer_id: Uuid::new_v4(),
                    accept: true
                }
            ),
            Err(TransitionError::NotFound(_))
        ));

        run(&mut deal, &p.seller, respond(false)).unwrap();
        assert_eq!(deal.counter_offers[0].status, CounterOfferStatus::Declined);
        assert_eq!(deal.final_price, None);
        assert_eq!(deal.items[0].price, dec!(100));

        assert!(matches!(
            run(&mut deal, &p.seller, respond(true)),
            Err(TransitionError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_counter_offers_blocked_in_closed_states() {
        let p = parties();
        let mut deal = deal(&p, DealMode::Direct, 1);
        let offer = || Transition::CreateCounterOffer {
            price: dec!(10),
            message: None,
        };

        assert!(matches!(
            run(
                &mut deal,
                &p.buyer,
                Transition::CreateCounterOffer {
                    price: dec!(0),
                    message: None
                }
            ),
            Err(TransitionError::Validation(_))
        ));

        run(&mut deal, &p.seller, Transition::Cancel).unwrap();
        assert!(matches!(
            run(&mut deal, &p.buyer, offer()),
            Err(TransitionError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_finish_expired() {
        let p = parties();
        let machine = DealStateMachine::new();
        let mut deal = deal(&p, DealMode::Guaranteed, 1);
        run(&mut deal, &p.seller, Transition::Start).unwrap();

        let now = Utc::now();
        assert_eq!(machine.finish_expired(&mut deal, now), Ok(Effect::Finished));
        assert_eq!(deal.status, DealStatus::Ended);
        assert_eq!(deal.ended_at, Some(now));
        assert_eq!(deal.timeline.last().map(|e| e.actor), Some(None));

        assert!(matches!(
            machine.finish_expired(&mut deal, now),
            Err(TransitionError::InvalidTransition(_))
        ));
    }
}
