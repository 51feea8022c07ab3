//! Deal Service
//!
//! Runs state-machine transitions against the write-back cache and fans out
//! what follows from them: room events, stats and personal notices.

use dealroom_cache::WriteBackCache;
use dealroom_core::{
    AuctionId, AuctionStats, CounterOfferId, Deal, DealEvent, DealId, DealItem, DealMode,
    DealView, NewDeal, Timestamp, UserId, UserNotice,
};
use dealroom_lifecycle::{DealStateMachine, Effect, Transition};
use dealroom_ports::{Clock, DealFilter, DealStore, EventSink, Notifier, StatsRecorder, StoreError};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{DealError, DealResult};

/// Request to open a deal between a seller and a buyer
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDeal {
    pub auction_id: Option<AuctionId>,
    pub seller_id: UserId,
    pub buyer_id: Option<UserId>,
    pub mode: DealMode,
    pub items: Vec<DealItem>,
    pub starting_price: Decimal,
    pub final_price: Option<Decimal>,
    pub guarantee_enabled: bool,
    pub guarantee_initiated_by: Option<UserId>,
    pub auto_cancel_at: Option<Timestamp>,
    pub auction_stats: AuctionStats,
}

impl CreateDeal {
    pub fn direct(
        seller_id: UserId,
        buyer_id: UserId,
        items: Vec<DealItem>,
        starting_price: Decimal,
    ) -> Self {
        Self {
            auction_id: None,
            seller_id,
            buyer_id: Some(buyer_id),
            mode: DealMode::Direct,
            items,
            starting_price,
            final_price: None,
            guarantee_enabled: false,
            guarantee_initiated_by: None,
            auto_cancel_at: None,
            auction_stats: AuctionStats::default(),
        }
    }

    pub fn from_auction(mut self, auction_id: AuctionId, stats: AuctionStats) -> Self {
        self.auction_id = Some(auction_id);
        self.auction_stats = stats;
        self
    }

    /// Switch to guaranteed mode, initiated by `initiated_by`
    pub fn guaranteed(mut self, initiated_by: UserId, auto_cancel_at: Option<Timestamp>) -> Self {
        self.mode = DealMode::Guaranteed;
        self.guarantee_enabled = true;
        self.guarantee_initiated_by = Some(initiated_by);
        self.auto_cancel_at = auto_cancel_at;
        self
    }

    fn into_new_deal(self, now: Timestamp) -> NewDeal {
        NewDeal {
            auction_id: self.auction_id,
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            mode: self.mode,
            items: self
                .items
                .into_iter()
                .map(|item| {
                    let quantity = item.quantity;
                    item.with_quantity(quantity)
                })
                .collect(),
            starting_price: self.starting_price,
            final_price: self.final_price,
            guarantee_enabled: self.guarantee_enabled,
            guarantee_initiated_by: self.guarantee_initiated_by,
            auto_cancel_at: self.auto_cancel_at,
            auction_stats: self.auction_stats,
            requested_at: now,
        }
    }
}

/// Application service for the deal lifecycle
pub struct DealService {
    cache: Arc<WriteBackCache>,
    store: Arc<dyn DealStore>,
    events: Arc<dyn EventSink>,
    stats: Arc<dyn StatsRecorder>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    machine: DealStateMachine,
}

impl DealService {
    pub fn new(
        cache: Arc<WriteBackCache>,
        store: Arc<dyn DealStore>,
        events: Arc<dyn EventSink>,
        stats: Arc<dyn StatsRecorder>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            store,
            events,
            stats,
            notifier,
            clock,
            machine: DealStateMachine::new(),
        }
    }

    pub fn cache(&self) -> &Arc<WriteBackCache> {
        &self.cache
    }

    /// Open a deal, or return the live one already opened for the same auction
    pub async fn create_deal(&self, ctx: &RequestContext, request: CreateDeal) -> DealResult<DealView> {
        let actor = &ctx.actor;
        let involved = actor.user_id == request.seller_id || Some(actor.user_id) == request.buyer_id;
        if !involved && !actor.is_admin() {
            return Err(DealError::Forbidden(
                "only the seller, the buyer or staff may open a deal".to_string(),
            ));
        }
        if request.items.is_empty() {
            return Err(DealError::Validation("a deal needs at least one item".to_string()));
        }
        if request.starting_price.is_sign_negative() {
            return Err(DealError::Validation("starting price must not be negative".to_string()));
        }

        if let Some(auction_id) = request.auction_id {
            if let Some(existing) = self.store.find_one(&DealFilter::by_auction(auction_id)).await? {
                debug!(
                    "Deal already open request_id={} auction_id={} deal_id={}",
                    ctx.request_id, auction_id, existing.id
                );
                return self.current_view(existing).await;
            }
        }

        let auction_id = request.auction_id;
        let deal = match self.store.create(request.into_new_deal(self.clock.now())).await {
            Ok(deal) => deal,
            Err(StoreError::DuplicateAuction(_)) => {
                // Lost a creation race; the winner is the deal to use
                let auction_id = auction_id.ok_or_else(|| {
                    DealError::Infrastructure("duplicate auction without an auction id".to_string())
                })?;
                let winner = self
                    .store
                    .find_one(&DealFilter::by_auction(auction_id))
                    .await?
                    .ok_or_else(|| {
                        DealError::Infrastructure(format!(
                            "deal for auction {auction_id} vanished after a duplicate insert"
                        ))
                    })?;
                return self.current_view(winner).await;
            }
            Err(err) => return Err(err.into()),
        };

        self.cache.set(deal.clone(), false);
        let view = DealView::build(&deal);
        self.events.emit(DealEvent::Created(view.clone()));
        info!(
            "Deal created request_id={} deal_id={} seller_id={} buyer_id={:?} mode={:?}",
            ctx.request_id, deal.id, deal.seller_id, deal.buyer_id, deal.mode
        );
        Ok(view)
    }

    /// Deal as seen by a participant or staff
    pub async fn details(&self, ctx: &RequestContext, deal_id: DealId) -> DealResult<DealView> {
        let deal = self.cache.get(deal_id).await?;
        if !deal.is_participant(ctx.user_id()) && !ctx.actor.is_admin() {
            return Err(DealError::Forbidden(
                "only participants may view this deal".to_string(),
            ));
        }
        Ok(DealView::build(&deal))
    }

    /// Apply a participant action and run its effects
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        transition: Transition,
    ) -> DealResult<DealView> {
        let action = transition.action();
        let now = self.clock.now();
        let machine = self.machine;
        let actor = &ctx.actor;

        let result = self
            .cache
            .mutate(deal_id, |deal| {
                let effect = machine.apply(deal, actor, transition, now)?;
                Ok::<_, DealError>((effect, deal.clone()))
            })
            .await;

        let (effect, deal) = match result {
            Ok(applied) => applied,
            Err(err) => {
                warn!(
                    "Deal action rejected request_id={} deal_id={} user_id={} action={} code={}: {}",
                    ctx.request_id,
                    deal_id,
                    actor.user_id,
                    action,
                    err.code(),
                    err
                );
                return Err(err);
            }
        };

        info!(
            "Deal action applied request_id={} deal_id={} user_id={} action={} status={}",
            ctx.request_id, deal_id, actor.user_id, action, deal.status
        );
        Ok(self.run_effects(effect, &deal).await)
    }

    pub async fn start(&self, ctx: &RequestContext, deal_id: DealId) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::Start).await
    }

    pub async fn confirm_payment(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        note: Option<String>,
    ) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::ConfirmPayment { note }).await
    }

    pub async fn confirm_delivery(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        note: Option<String>,
    ) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::ConfirmDelivery { note }).await
    }

    pub async fn confirm_acceptance(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        note: Option<String>,
    ) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::ConfirmAcceptance { note }).await
    }

    pub async fn close(&self, ctx: &RequestContext, deal_id: DealId) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::Close).await
    }

    pub async fn cancel(&self, ctx: &RequestContext, deal_id: DealId) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::Cancel).await
    }

    pub async fn open_dispute(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        reason: String,
    ) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::OpenDispute { reason }).await
    }

    pub async fn create_counter_offer(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        price: Decimal,
        message: Option<String>,
    ) -> DealResult<DealView> {
        self.apply(ctx, deal_id, Transition::CreateCounterOffer { price, message })
            .await
    }

    pub async fn respond_counter_offer(
        &self,
        ctx: &RequestContext,
        deal_id: DealId,
        counter_offer_id: CounterOfferId,
        accept: bool,
    ) -> DealResult<DealView> {
        self.apply(
            ctx,
            deal_id,
            Transition::RespondCounterOffer {
                counter_offer_id,
                accept,
            },
        )
        .await
    }

    /// Finish a deal past its auto-cancel deadline on behalf of the scheduler
    pub async fn finish_expired(&self, deal_id: DealId) -> DealResult<DealView> {
        let now = self.clock.now();
        let machine = self.machine;
        let (effect, deal) = self
            .cache
            .mutate(deal_id, |deal| {
                if !deal.is_expired(now) {
                    return Err(DealError::InvalidTransition(format!(
                        "deal {} is not past its deadline",
                        deal.id
                    )));
                }
                let effect = machine.finish_expired(deal, now)?;
                Ok::<_, DealError>((effect, deal.clone()))
            })
            .await?;

        info!("Deal expired deal_id={} status={}", deal_id, deal.status);
        Ok(self.run_effects(effect, &deal).await)
    }

    async fn current_view(&self, stored: Deal) -> DealResult<DealView> {
        // The cached copy is authoritative while it exists
        let deal = self.cache.get(stored.id).await?;
        Ok(DealView::build(&deal))
    }

    async fn run_effects(&self, effect: Effect, deal: &Deal) -> DealView {
        let view = DealView::build(deal);
        self.events.emit(DealEvent::Changed(view.clone()));

        match effect {
            Effect::Changed => {}
            Effect::Finished => {
                self.events.emit(DealEvent::Finished(view.clone()));
                if let Err(err) = self.stats.record_deal(deal).await {
                    error!("Stats recording failed deal_id={}: {}", deal.id, err);
                }
                self.notify_participants(deal, UserNotice::deal_finished).await;
            }
            Effect::Cancelled => {
                self.notify_participants(deal, UserNotice::deal_cancelled).await;
            }
        }
        view
    }

    async fn notify_participants(&self, deal: &Deal, notice: fn(DealId, UserId) -> UserNotice) {
        let recipients = std::iter::once(deal.seller_id).chain(deal.buyer_id);
        for user_id in recipients {
            if let Err(err) = self.notifier.notify_user(user_id, notice(deal.id, user_id)).await {
                warn!(
                    "Notification failed deal_id={} user_id={}: {}",
                    deal.id, user_id, err
                );
            }
        }
    }
}
