//! Bootstrap - wires every component of a running dealroom
//!
//! Construction order follows the dependency graph:
//! store → cache → room hub → services → sessions → gateway → reconciler.

use dealroom_cache::WriteBackCache;
use dealroom_deal_manager::{ChatService, DealParticipantValidator, DealService};
use dealroom_gateway::{DealGateway, RoomHub};
use dealroom_ports::{Clock, DealStore, StatsRecorder};
use dealroom_reconciler::{Reconciler, ReconcilerHandle, TickReport};
use dealroom_session::SessionManager;
use log::info;
use std::sync::Arc;

use crate::config::DealroomConfig;

/// Every live component of one process
pub struct Dealroom {
    pub cache: Arc<WriteBackCache>,
    pub hub: Arc<RoomHub>,
    pub deals: Arc<DealService>,
    pub chat: Arc<ChatService>,
    pub sessions: Arc<SessionManager>,
    pub gateway: Arc<DealGateway>,
    reconciler: ReconcilerHandle,
}

/// Build and start a dealroom; must run inside a tokio runtime
pub fn bootstrap(
    config: &DealroomConfig,
    store: Arc<dyn DealStore>,
    stats: Arc<dyn StatsRecorder>,
    clock: Arc<dyn Clock>,
) -> Dealroom {
    let cache = Arc::new(WriteBackCache::with_config(
        Arc::clone(&store),
        Arc::clone(&clock),
        config.cache.clone(),
    ));
    let hub = Arc::new(RoomHub::new(config.gateway.room_capacity));

    let deals = Arc::new(DealService::new(
        Arc::clone(&cache),
        Arc::clone(&store),
        hub.clone(),
        stats,
        hub.clone(),
        Arc::clone(&clock),
    ));
    let chat = Arc::new(ChatService::new(
        Arc::clone(&cache),
        hub.clone(),
        Arc::clone(&clock),
    ));

    let sessions = Arc::new(SessionManager::new(config.session.clone()));
    let gateway = DealGateway::new(
        Arc::clone(&deals),
        Arc::clone(&chat),
        Arc::clone(&sessions),
        Arc::clone(&hub),
        Arc::new(DealParticipantValidator::new(Arc::clone(&cache))),
        config.gateway.clone(),
    );

    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&cache),
        store,
        Arc::clone(&deals),
        clock.clone(),
        config.reconciler.clone(),
    ))
    .spawn();

    info!("Dealroom started clock={}", clock.name());
    Dealroom {
        cache,
        hub,
        deals,
        chat,
        sessions,
        gateway,
        reconciler,
    }
}

impl Dealroom {
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        self.reconciler.reconciler()
    }

    /// Close every connection, stop the jobs and flush what is still dirty
    pub async fn shutdown(self) -> TickReport {
        let closed = self.gateway.close_all();
        info!("Dealroom stopping, closed {} connections", closed);
        self.reconciler.shutdown().await
    }
}
