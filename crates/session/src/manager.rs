use dashmap::DashMap;
use dealroom_core::{ConnectionId, DealId, UserId};
use dealroom_ports::ParticipantValidator;
use log::{debug, info};
use std::sync::Arc;

use crate::activity::ActivityTracker;
use crate::config::SessionConfig;
use crate::connections::ConnectionRegistry;
use crate::error::{SessionError, SessionResult};
use crate::rate_limit::MessageRateLimiter;
use crate::signal::SessionCallback;
use crate::validation::ValidationRegistry;

/// Who owns a connection and which deal it is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBinding {
    pub user_id: UserId,
    pub deal_id: Option<DealId>,
}

/// Result of admitting a new connection
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Older connections pushed out by the cap, already released here
    pub evicted: Vec<(ConnectionId, SessionBinding)>,
}

impl Admission {
    pub fn evicted_ids(&self) -> Vec<ConnectionId> {
        self.evicted.iter().map(|(id, _)| *id).collect()
    }
}

/// Owner of all per-connection session state
///
/// ```text
/// connecting ──admit──▶ admitted ──track──▶ active ◀──refresh──▶ idle-checked
///                          │                   │
///                          └──────release──────┴──▶ disconnected
/// ```
///
/// Eviction, inactivity and failed re-validation all end in `release`, which
/// cancels every timer the connection owns.
pub struct SessionManager {
    config: SessionConfig,
    connections: ConnectionRegistry,
    activity: ActivityTracker,
    validation: ValidationRegistry,
    rate_limiter: MessageRateLimiter,
    bindings: DashMap<ConnectionId, SessionBinding>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            connections: ConnectionRegistry::new(config.max_connections_per_user),
            activity: ActivityTracker::new(config.inactivity_timeout()),
            validation: ValidationRegistry::new(),
            rate_limiter: MessageRateLimiter::new(config.message_limit, config.message_window()),
            bindings: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Admit a connection under the per-user cap
    pub fn admit(&self, user_id: UserId, connection_id: ConnectionId) -> Admission {
        let pushed_out = self.connections.admit(user_id, connection_id);
        self.bindings.insert(
            connection_id,
            SessionBinding {
                user_id,
                deal_id: None,
            },
        );

        let evicted = pushed_out
            .into_iter()
            .filter_map(|old| self.teardown(old).map(|binding| (old, binding)))
            .collect();
        Admission { evicted }
    }

    /// Attach an admitted connection to a deal and arm its timers
    pub fn track(
        &self,
        connection_id: ConnectionId,
        deal_id: DealId,
        validator: Arc<dyn ParticipantValidator>,
        on_idle: SessionCallback,
        on_invalid: SessionCallback,
    ) -> SessionResult<()> {
        let user_id = {
            let mut binding = self
                .bindings
                .get_mut(&connection_id)
                .ok_or(SessionError::UnknownConnection(connection_id))?;
            binding.deal_id = Some(deal_id);
            binding.user_id
        };

        self.activity.track(connection_id, deal_id, on_idle);
        self.validation.register(
            deal_id,
            user_id,
            connection_id,
            validator,
            self.config.validation_interval(),
            on_invalid,
        );
        debug!(
            "Session tracked connection_id={} deal_id={} user_id={}",
            connection_id, deal_id, user_id
        );
        Ok(())
    }

    /// Record an interaction; false if the connection is not tracked
    pub fn refresh(&self, connection_id: ConnectionId) -> bool {
        self.activity.refresh(connection_id)
    }

    pub fn check_message_rate(&self, user_id: UserId) -> SessionResult<()> {
        self.rate_limiter.check(user_id)
    }

    /// Drop a connection and cancel its timers
    pub fn release(&self, connection_id: ConnectionId) -> Option<SessionBinding> {
        let binding = self.teardown(connection_id)?;
        info!(
            "Session released connection_id={} user_id={} deal_id={:?}",
            connection_id, binding.user_id, binding.deal_id
        );
        Some(binding)
    }

    pub fn binding(&self, connection_id: ConnectionId) -> Option<SessionBinding> {
        self.bindings.get(&connection_id).map(|b| *b)
    }

    pub fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.connections.connections(user_id)
    }

    pub fn is_tracked(&self, connection_id: ConnectionId) -> bool {
        self.activity.is_tracked(connection_id)
    }

    pub fn has_validation_timer(&self, deal_id: DealId, user_id: UserId) -> bool {
        self.validation.has_timer(deal_id, user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }

    fn teardown(&self, connection_id: ConnectionId) -> Option<SessionBinding> {
        let (_, binding) = self.bindings.remove(&connection_id)?;
        self.connections.release(binding.user_id, connection_id);
        self.activity.remove(connection_id);
        if let Some(deal_id) = binding.deal_id {
            self.validation
                .unregister(deal_id, binding.user_id, connection_id);
        }
        // The window follows the user, not the socket
        if self.connections.connections(binding.user_id).is_empty() {
            self.rate_limiter.purge(binding.user_id);
        }
        Some(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dealroom_ports::ValidationError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    struct AlwaysValid;

    #[async_trait]
    impl ParticipantValidator for AlwaysValid {
        async fn validate(&self, _deal: DealId, _user: UserId) -> Result<bool, ValidationError> {
            Ok(true)
        }
    }

    fn noop() -> SessionCallback {
        Box::new(|| {})
    }

    #[tokio::test]
    async fn test_admit_beyond_cap_releases_the_oldest() {
        let manager = SessionManager::new(SessionConfig {
            max_connections_per_user: 2,
            ..SessionConfig::default()
        });
        let (user, deal) = (Uuid::new_v4(), Uuid::new_v4());
        let conns: Vec<_> = (0..3).map(|_| Uuid::new_v4()).collect();

        for conn in &conns[..2] {
            assert!(manager.admit(user, *conn).evicted.is_empty());
            manager
                .track(*conn, deal, Arc::new(AlwaysValid), noop(), noop())
                .unwrap();
        }
        let admission = manager.admit(user, conns[2]);

        assert_eq!(admission.evicted_ids(), vec![conns[0]]);
        assert_eq!(admission.evicted[0].1.deal_id, Some(deal));
        assert!(!manager.is_tracked(conns[0]));
        assert!(manager.binding(conns[0]).is_none());
        assert_eq!(manager.connections_of(user), conns[1..].to_vec());
    }

    #[tokio::test]
    async fn test_track_unknown_connection_fails() {
        let manager = SessionManager::new(SessionConfig::default());
        let conn = Uuid::new_v4();

        let result = manager.track(conn, Uuid::new_v4(), Arc::new(AlwaysValid), noop(), noop());

        assert_eq!(result, Err(SessionError::UnknownConnection(conn)));
    }

    #[tokio::test]
    async fn test_release_cancels_every_timer() {
        let manager = SessionManager::new(SessionConfig::default());
        let (user, deal, conn) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        manager.admit(user, conn);
        manager
            .track(conn, deal, Arc::new(AlwaysValid), noop(), noop())
            .unwrap();
        assert!(manager.has_validation_timer(deal, user));

        let binding = manager.release(conn).unwrap();

        assert_eq!(binding.user_id, user);
        assert!(!manager.is_tracked(conn));
        assert!(!manager.has_validation_timer(deal, user));
        assert!(manager.release(conn).is_none());
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_connection_fires_timeout_once() {
        let manager = SessionManager::new(SessionConfig {
            inactivity_timeout_ms: 1_000,
            ..SessionConfig::default()
        });
        let (user, deal, conn) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let idle = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&idle);
        manager.admit(user, conn);
        manager
            .track(
                conn,
                deal,
                Arc::new(AlwaysValid),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
                noop(),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(manager.refresh(conn));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(idle.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(idle.load(Ordering::SeqCst), 1);
        assert!(!manager.refresh(conn));
    }

    #[tokio::test]
    async fn test_rate_window_survives_other_connections() {
        let manager = SessionManager::new(SessionConfig {
            message_limit: 1,
            ..SessionConfig::default()
        });
        let user = Uuid::new_v4();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        manager.admit(user, first);
        manager.admit(user, second);

        assert!(manager.check_message_rate(user).is_ok());
        manager.release(first);
        assert!(matches!(
            manager.check_message_rate(user),
            Err(SessionError::RateLimited { .. })
        ));

        manager.release(second);
        manager.admit(user, Uuid::new_v4());
        assert!(manager.check_message_rate(user).is_err());
    }
}
