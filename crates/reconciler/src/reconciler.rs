use dealroom_cache::WriteBackCache;
use dealroom_deal_manager::{DealError, DealService};
use dealroom_ports::{Clock, DealStore};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ReconcilerConfig;
use crate::report::{TickOutcome, TickReport};

/// Marks a job as running until dropped
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Sync,
    Evict,
    Expire,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Sync => "sync",
            Job::Evict => "evict",
            Job::Expire => "expire",
        }
    }
}

/// Brings the durable store back in line with the cache
///
/// A tick that finds its job still running is skipped, never queued. Sync
/// and eviction share one flush lock, so at most one save per deal is in
/// flight and an older revision can never land after a newer one.
pub struct Reconciler {
    cache: Arc<WriteBackCache>,
    store: Arc<dyn DealStore>,
    deals: Arc<DealService>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    flushing: Mutex<()>,
    expiring: AtomicBool,
}

impl Reconciler {
    pub fn new(
        cache: Arc<WriteBackCache>,
        store: Arc<dyn DealStore>,
        deals: Arc<DealService>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            cache,
            store,
            deals,
            clock,
            config,
            flushing: Mutex::new(()),
            expiring: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub async fn run(&self, job: Job) -> TickOutcome {
        match job {
            Job::Sync => self.sync_changed().await,
            Job::Evict => self.evict_stale().await,
            Job::Expire => self.finish_expired().await,
        }
    }

    /// Flush every dirty entry; failures stay dirty for the next tick
    pub async fn sync_changed(&self) -> TickOutcome {
        let Ok(_flushing) = self.flushing.try_lock() else {
            debug!("Sync tick skipped, a flush is still active");
            return TickOutcome::Skipped;
        };
        TickOutcome::Completed(self.flush_changed().await)
    }

    /// Flush, then evict, every stale entry
    ///
    /// A dirty entry gets exactly one final flush attempt. It is evicted
    /// whatever the outcome; a failed flush is logged with its revision.
    pub async fn evict_stale(&self) -> TickOutcome {
        let Ok(_flushing) = self.flushing.try_lock() else {
            debug!("Eviction tick skipped, a flush is still active");
            return TickOutcome::Skipped;
        };

        let mut report = TickReport::default();
        let stale = self.cache.stale_entries(self.cache.config().stale_after());
        for entry in stale {
            let id = entry.deal.id;
            if entry.dirty {
                report.attempted += 1;
                match self.store.save(&entry.deal).await {
                    Ok(_) => {
                        self.cache.mark_synced(id, entry.revision);
                        report.flushed += 1;
                    }
                    Err(err) => {
                        report.failed += 1;
                        error!(
                            "Final flush failed, evicting unsaved deal deal_id={} revision={}: {}",
                            id, entry.revision, err
                        );
                    }
                }
            }

            if self.cache.evict(id, entry.revision) {
                report.evicted += 1;
            } else {
                debug!(
                    "Eviction skipped, deal changed since snapshot deal_id={} revision={}",
                    id, entry.revision
                );
            }
        }

        if report.evicted > 0 || report.failed > 0 {
            info!(
                "Eviction sweep evicted={} flushed={} failed={} remaining={}",
                report.evicted,
                report.flushed,
                report.failed,
                self.cache.len()
            );
        }
        TickOutcome::Completed(report)
    }

    /// Drive deals past their auto-cancel deadline through the finish path
    pub async fn finish_expired(&self) -> TickOutcome {
        let Some(_running) = RunningFlag::acquire(&self.expiring) else {
            debug!("Expiry tick skipped, previous run still active");
            return TickOutcome::Skipped;
        };

        let mut report = TickReport::default();
        let expired = match self.store.query_expired(self.clock.now()).await {
            Ok(deals) => deals,
            Err(err) => {
                error!("Expiry query failed: {}", err);
                report.failed += 1;
                return TickOutcome::Completed(report);
            }
        };

        for deal in expired {
            report.attempted += 1;
            match self.deals.finish_expired(deal.id).await {
                Ok(_) => report.finished += 1,
                // The cached copy is ahead of the store and already final
                Err(DealError::InvalidTransition(reason)) => {
                    debug!("Expired deal skipped deal_id={}: {}", deal.id, reason)
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("Finishing expired deal failed deal_id={}: {}", deal.id, err);
                }
            }
        }

        if report.attempted > 0 {
            info!(
                "Expiry sweep finished={} failed={} of {}",
                report.finished, report.failed, report.attempted
            );
        }
        TickOutcome::Completed(report)
    }

    /// Flush every dirty entry, waiting for a running sync or sweep first
    pub async fn flush_all(&self) -> TickReport {
        let _flushing = self.flushing.lock().await;
        self.flush_changed().await
    }

    async fn flush_changed(&self) -> TickReport {
        let mut report = TickReport::default();
        for dirty in self.cache.changed() {
            report.attempted += 1;
            let id = dirty.deal.id;
            match self.store.save(&dirty.deal).await {
                Ok(_) => {
                    self.cache.mark_synced(id, dirty.revision);
                    report.flushed += 1;
                }
                Err(err) => {
                    report.failed += 1;
                    error!(
                        "Flush failed deal_id={} revision={}: {}",
                        id, dirty.revision, err
                    );
                }
            }
        }

        if report.attempted > 0 {
            debug!("Sync flushed={} failed={}", report.flushed, report.failed);
        }
        report
    }

    /// Start the three periodic jobs
    pub fn spawn(self: &Arc<Self>) -> ReconcilerHandle {
        let (shutdown, signal) = watch::channel(false);
        let jobs = [
            (Job::Sync, self.config.sync_interval()),
            (Job::Evict, self.config.eviction_interval()),
            (Job::Expire, self.config.expiry_interval()),
        ];
        let loops = jobs
            .into_iter()
            .map(|(job, period)| {
                tokio::spawn(job_loop(Arc::clone(self), job, period, signal.clone()))
            })
            .collect();

        info!(
            "Reconciler started sync_ms={} eviction_ms={} expiry_ms={}",
            self.config.sync_interval_ms,
            self.config.eviction_interval_ms,
            self.config.expiry_interval_ms
        );
        ReconcilerHandle {
            reconciler: Arc::clone(self),
            shutdown,
            loops,
        }
    }
}

async fn job_loop(
    reconciler: Arc<Reconciler>,
    job: Job,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Detached from the ticker; overlap is handled by the job's flag
                let reconciler = Arc::clone(&reconciler);
                tokio::spawn(async move {
                    reconciler.run(job).await;
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("Reconciler loop stopped job={}", job.name());
}

/// Owner of the running job loops
pub struct ReconcilerHandle {
    reconciler: Arc<Reconciler>,
    shutdown: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
}

impl ReconcilerHandle {
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Stop the loops and flush whatever is still dirty
    pub async fn shutdown(self) -> TickReport {
        let _ = self.shutdown.send(true);
        for handle in self.loops {
            if let Err(err) = handle.await {
                warn!("Reconciler loop ended abnormally: {}", err);
            }
        }

        let report = self.reconciler.flush_all().await;
        info!(
            "Reconciler stopped final_flush flushed={} failed={}",
            report.flushed, report.failed
        );
        report
    }
}
