use dashmap::DashMap;
use dealroom_cache::WriteBackCache;
use dealroom_core::{Actor, ConnectionId, DealId, MessageView, Reaction, UserId};
use dealroom_deal_manager::{ChatService, DealError, DealService, ErrorCode, RequestContext};
use dealroom_ports::ParticipantValidator;
use dealroom_session::{DisconnectReason, SessionCallback, SessionManager};
use log::{debug, info, warn};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::messages::{ClientEvent, Envelope, ServerMessage};
use crate::transport::{RoomHub, spawn_forwarder};

/// Client side of an accepted connection
///
/// The disconnect signal travels apart from the bounded push queue, so a
/// slow client still gets it, after whatever was queued before it.
#[derive(Debug)]
pub struct ClientSession {
    pub connection_id: ConnectionId,
    pub deal_id: DealId,
    pub user_id: UserId,
    outbound: mpsc::Receiver<ServerMessage>,
    signal: Option<oneshot::Receiver<ServerMessage>>,
}

impl ClientSession {
    /// Next push; `None` once the server has closed the connection
    pub async fn next(&mut self) -> Option<ServerMessage> {
        if let Some(message) = self.outbound.recv().await {
            return Some(message);
        }
        self.signal.take()?.await.ok()
    }

    pub fn try_next(&mut self) -> Option<ServerMessage> {
        match self.outbound.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                let signal = self.signal.as_mut()?.try_recv().ok();
                if signal.is_some() {
                    self.signal = None;
                }
                signal
            }
        }
    }
}

struct Connection {
    actor: Actor,
    deal_id: DealId,
    signal: oneshot::Sender<ServerMessage>,
    forwarder: JoinHandle<()>,
}

/// Realtime entry point for deal rooms
///
/// Accepts authenticated connections, keeps their session timers armed and
/// turns inbound [`ClientEvent`]s into service calls. Every event gets
/// exactly one [`Envelope`] back.
pub struct DealGateway {
    deals: Arc<DealService>,
    chat: Arc<ChatService>,
    cache: Arc<WriteBackCache>,
    sessions: Arc<SessionManager>,
    hub: Arc<RoomHub>,
    validator: Arc<dyn ParticipantValidator>,
    config: GatewayConfig,
    connections: DashMap<ConnectionId, Connection>,
    this: Weak<DealGateway>,
}

impl DealGateway {
    pub fn new(
        deals: Arc<DealService>,
        chat: Arc<ChatService>,
        sessions: Arc<SessionManager>,
        hub: Arc<RoomHub>,
        validator: Arc<dyn ParticipantValidator>,
        config: GatewayConfig,
    ) -> Arc<Self> {
        let cache = Arc::clone(deals.cache());
        Arc::new_cyclic(|this| Self {
            deals,
            chat,
            cache,
            sessions,
            hub,
            validator,
            config,
            connections: DashMap::new(),
            this: this.clone(),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn hub(&self) -> &Arc<RoomHub> {
        &self.hub
    }

    /// Accept a connection into a deal room
    ///
    /// Older connections of the same user beyond the cap are closed with
    /// `maxConnectionsExceeded` before the deal is even loaded. A caller who
    /// is not a live participant is released again and gets the error.
    pub async fn connect(&self, actor: Actor, deal_id: DealId) -> GatewayResult<ClientSession> {
        let connection_id = Uuid::new_v4();
        let user_id = actor.user_id;

        let admission = self.sessions.admit(user_id, connection_id);
        for (evicted, _) in &admission.evicted {
            self.close(*evicted, DisconnectReason::MaxConnectionsExceeded);
        }

        if let Err(err) = self.authorize(deal_id, user_id).await {
            self.sessions.release(connection_id);
            warn!(
                "Connection rejected user_id={} deal_id={}: {}",
                user_id, deal_id, err
            );
            return Err(err);
        }

        let room = self.hub.join_room(deal_id);
        let personal = self.hub.join_user(user_id);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let (signal_tx, signal_rx) = oneshot::channel();
        let forwarder = spawn_forwarder(room, personal, outbound_tx);
        self.connections.insert(
            connection_id,
            Connection {
                actor,
                deal_id,
                signal: signal_tx,
                forwarder,
            },
        );
        self.cache.register_online(deal_id, user_id);
        self.cache.touch(deal_id);

        let tracked = self.sessions.track(
            connection_id,
            deal_id,
            Arc::clone(&self.validator),
            self.on_timer(connection_id, DisconnectReason::InactivityTimeout),
            self.on_timer(connection_id, DisconnectReason::ValidationFailed),
        );
        if let Err(err) = tracked {
            // Pushed out by a concurrent connect before it was tracked
            self.close(connection_id, DisconnectReason::MaxConnectionsExceeded);
            return Err(err.into());
        }

        info!(
            "Connection accepted connection_id={} user_id={} deal_id={}",
            connection_id, user_id, deal_id
        );
        Ok(ClientSession {
            connection_id,
            deal_id,
            user_id,
            outbound: outbound_rx,
            signal: Some(signal_rx),
        })
    }

    /// Client went away; false if the connection was already gone
    pub fn disconnect(&self, connection_id: ConnectionId) -> bool {
        self.close(connection_id, DisconnectReason::Closed)
    }

    /// Close every live connection
    pub fn close_all(&self) -> usize {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|c| *c.key()).collect();
        ids.into_iter()
            .filter(|id| self.close(*id, DisconnectReason::Closed))
            .count()
    }

    pub fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Dispatch one inbound event and build its reply
    pub async fn handle(&self, connection_id: ConnectionId, event: ClientEvent) -> Envelope {
        let name = event.name();
        match self.dispatch(connection_id, event).await {
            Ok(envelope) => envelope,
            Err(err) => {
                let code = err.code();
                if code == ErrorCode::Infrastructure {
                    warn!(
                        "Event failed event={} connection_id={}: {}",
                        name, connection_id, err
                    );
                } else {
                    debug!(
                        "Event rejected event={} connection_id={} code={}: {}",
                        name, connection_id, code, err
                    );
                }
                Envelope::error(code, err.to_string())
            }
        }
    }

    /// Parse a raw JSON frame, then [`DealGateway::handle`] it
    pub async fn handle_json(&self, connection_id: ConnectionId, raw: &str) -> Envelope {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => self.handle(connection_id, event).await,
            Err(err) => {
                let err = GatewayError::Malformed(err.to_string());
                Envelope::error(err.code(), err.to_string())
            }
        }
    }

    async fn dispatch(
        &self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> GatewayResult<Envelope> {
        let (actor, bound) = self
            .connections
            .get(&connection_id)
            .map(|c| (c.actor.clone(), c.deal_id))
            .ok_or(GatewayError::UnknownConnection(connection_id))?;

        self.sessions.refresh(connection_id);
        self.cache.touch(bound);

        let requested = event.deal_id();
        if requested != bound {
            return Err(GatewayError::WrongDeal { bound, requested });
        }

        let ctx = RequestContext::new(actor);
        let deal_id = bound;
        let view = match event {
            ClientEvent::SendMessage { text, .. } => {
                self.sessions.check_message_rate(ctx.user_id())?;
                let message = self.chat.add_message(&ctx, deal_id, &text).await?;
                return Ok(Envelope::ok(&message));
            }
            ClientEvent::AddReaction {
                message_id,
                reaction,
                ..
            } => {
                let parsed = Reaction::from_symbol(&reaction).map_err(|()| {
                    GatewayError::Malformed(format!("unknown reaction {reaction:?}"))
                })?;
                let outcome = self
                    .chat
                    .set_reaction(&ctx, deal_id, message_id, parsed)
                    .await?;
                return Ok(Envelope::ok(&MessageView {
                    deal_id,
                    message: outcome.message,
                }));
            }
            ClientEvent::Start { .. } => self.deals.start(&ctx, deal_id).await?,
            ClientEvent::ConfirmPayment { note, .. } => {
                self.deals.confirm_payment(&ctx, deal_id, note).await?
            }
            ClientEvent::ConfirmDelivery { note, .. } => {
                self.deals.confirm_delivery(&ctx, deal_id, note).await?
            }
            ClientEvent::ConfirmAcceptance { note, .. } => {
                self.deals.confirm_acceptance(&ctx, deal_id, note).await?
            }
            ClientEvent::Close { .. } => self.deals.close(&ctx, deal_id).await?,
            ClientEvent::Cancel { .. } => self.deals.cancel(&ctx, deal_id).await?,
            ClientEvent::Dispute { reason, .. } => {
                self.deals.open_dispute(&ctx, deal_id, reason).await?
            }
            ClientEvent::CounterOffer { price, message, .. } => {
                self.deals
                    .create_counter_offer(&ctx, deal_id, price, message)
                    .await?
            }
            ClientEvent::CounterOfferRespond {
                counter_offer_id,
                accept,
                ..
            } => {
                self.deals
                    .respond_counter_offer(&ctx, deal_id, counter_offer_id, accept)
                    .await?
            }
        };
        Ok(Envelope::ok(&view))
    }

    async fn authorize(&self, deal_id: DealId, user_id: UserId) -> GatewayResult<()> {
        self.cache.get(deal_id).await.map_err(DealError::from)?;
        if !self.validator.validate(deal_id, user_id).await? {
            return Err(GatewayError::NotParticipant(deal_id));
        }
        Ok(())
    }

    fn on_timer(&self, connection_id: ConnectionId, reason: DisconnectReason) -> SessionCallback {
        let gateway = self.this.clone();
        Box::new(move || {
            if let Some(gateway) = gateway.upgrade() {
                gateway.close(connection_id, reason);
            }
        })
    }

    /// Tear a connection down and send its final signal
    fn close(&self, connection_id: ConnectionId, reason: DisconnectReason) -> bool {
        let released = self.sessions.release(connection_id).is_some();
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return released;
        };

        // Aborting the forwarder drops the last queue sender, which lets the
        // client read past its queued pushes to the signal
        connection.forwarder.abort();
        if connection
            .signal
            .send(ServerMessage::disconnect(reason))
            .is_err()
        {
            debug!(
                "Client gone before disconnect signal connection_id={} reason={}",
                connection_id,
                reason.event_name()
            );
        }

        let (deal_id, user_id) = (connection.deal_id, connection.actor.user_id);
        let still_present = self
            .connections
            .iter()
            .any(|c| c.deal_id == deal_id && c.actor.user_id == user_id);
        if !still_present {
            self.cache.unregister_online(deal_id, user_id);
        }
        self.hub.prune(deal_id, user_id);

        info!(
            "Connection closed connection_id={} user_id={} deal_id={} reason={}",
            connection_id,
            user_id,
            deal_id,
            reason.event_name()
        );
        true
    }
}
