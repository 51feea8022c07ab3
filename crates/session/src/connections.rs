use dashmap::DashMap;
use dealroom_core::{ConnectionId, UserId};
use log::info;
use std::collections::VecDeque;

/// Active connection ids per user, oldest first
///
/// Enforces the per-user connection cap across every deal.
pub struct ConnectionRegistry {
    limit: usize,
    sessions: DashMap<UserId, VecDeque<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            sessions: DashMap::new(),
        }
    }

    /// Record a new connection, returning the connections pushed out to make room
    pub fn admit(&self, user_id: UserId, connection_id: ConnectionId) -> Vec<ConnectionId> {
        let mut session = self.sessions.entry(user_id).or_default();
        let mut evicted = Vec::new();
        while session.len() >= self.limit {
            match session.pop_front() {
                Some(oldest) => evicted.push(oldest),
                None => break,
            }
        }
        session.push_back(connection_id);

        if !evicted.is_empty() {
            info!(
                "Connection cap reached user_id={} limit={} evicted={:?}",
                user_id, self.limit, evicted
            );
        }
        evicted
    }

    /// Forget a connection; false if it was not registered
    pub fn release(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = match self.sessions.get_mut(&user_id) {
            Some(mut session) => match session.iter().position(|c| *c == connection_id) {
                Some(index) => session.remove(index).is_some(),
                None => false,
            },
            None => false,
        };
        self.sessions.remove_if(&user_id, |_, session| session.is_empty());
        removed
    }

    /// Connections of a user in arrival order
    pub fn connections(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.sessions
            .get(&user_id)
            .map(|session| session.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, user_id: UserId) -> Option<ConnectionId> {
        self.sessions
            .get(&user_id)
            .and_then(|session| session.back().copied())
    }

    pub fn is_active(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|session| session.contains(&connection_id))
    }

    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }
}
