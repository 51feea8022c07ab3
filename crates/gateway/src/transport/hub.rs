use async_trait::async_trait;
use dashmap::DashMap;
use dealroom_core::{DealEvent, DealId, UserId, UserNotice};
use dealroom_ports::{DeliveryError, EventSink, Notifier};
use log::{debug, trace};
use tokio::sync::broadcast;

use crate::messages::ServerMessage;

/// Broadcast rooms keyed by deal, plus one personal channel per user
///
/// Channels are created on first subscribe or publish and dropped by
/// [`RoomHub::prune`] once nobody listens.
pub struct RoomHub {
    rooms: DashMap<DealId, broadcast::Sender<ServerMessage>>,
    users: DashMap<UserId, broadcast::Sender<ServerMessage>>,
    capacity: usize,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            users: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn join_room(&self, deal_id: DealId) -> broadcast::Receiver<ServerMessage> {
        self.rooms
            .entry(deal_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn join_user(&self, user_id: UserId) -> broadcast::Receiver<ServerMessage> {
        self.users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Push to everyone in the room; returns how many receivers got it
    pub fn publish_room(&self, deal_id: DealId, message: ServerMessage) -> usize {
        let sent = match self.rooms.get(&deal_id) {
            Some(tx) => tx.send(message).ok(),
            None => return 0,
        };
        // Err only means nobody listens any more
        sent.unwrap_or_else(|| {
            self.rooms.remove_if(&deal_id, |_, tx| tx.receiver_count() == 0);
            0
        })
    }

    pub fn publish_user(&self, user_id: UserId, message: ServerMessage) -> usize {
        let Some(tx) = self.users.get(&user_id) else {
            return 0;
        };
        tx.send(message).unwrap_or(0)
    }

    pub fn room_size(&self, deal_id: DealId) -> usize {
        self.rooms
            .get(&deal_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Drop the room and personal channel when they have no receivers left
    pub fn prune(&self, deal_id: DealId, user_id: UserId) {
        if self
            .rooms
            .remove_if(&deal_id, |_, tx| tx.receiver_count() == 0)
            .is_some()
        {
            debug!("Room closed deal_id={}", deal_id);
        }
        self.users.remove_if(&user_id, |_, tx| tx.receiver_count() == 0);
    }
}

impl EventSink for RoomHub {
    fn emit(&self, event: DealEvent) {
        let room = event.room();
        let name = event.name();
        let delivered = self.publish_room(room, ServerMessage::from(event));
        trace!("Room push event={} deal_id={} receivers={}", name, room, delivered);
    }
}

#[async_trait]
impl Notifier for RoomHub {
    async fn notify_user(&self, user_id: UserId, notice: UserNotice) -> Result<(), DeliveryError> {
        let delivered = self.publish_user(user_id, ServerMessage::Notification(notice));
        if delivered == 0 {
            // Offline users pick the outcome up from the deal itself
            debug!("No live session for notice user_id={}", user_id);
        }
        Ok(())
    }
}
