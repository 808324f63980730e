//! Maintenance Task
//!
//! Periodic expiry sweep, memory rebalancing and auto-persistence.
//!
//! `MaintenanceScheduler` holds the logic and can be driven by any timer
//! through `tick()`. `spawn_maintenance_task` drives it from tokio intervals.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::{to_chrono, CleanupSummary, Clock, MediaCache};

// == Sweep Report ==
/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: CleanupSummary,
    /// Set when usage was above the pressure threshold
    pub rebalanced: Option<CleanupSummary>,
}

/// What one `tick()` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub swept: Option<SweepReport>,
    pub persisted: Option<usize>,
}

#[derive(Debug, Default)]
struct LastRun {
    sweep: Option<DateTime<Utc>>,
    persist: Option<DateTime<Utc>>,
}

// == Maintenance Scheduler ==
#[derive(Debug, Clone)]
pub struct MaintenanceScheduler {
    cache: Arc<MediaCache>,
    maintenance_interval: Duration,
    persistence_interval: Duration,
    last_run: Arc<Mutex<LastRun>>,
}

impl MaintenanceScheduler {
    pub fn new(
        cache: Arc<MediaCache>,
        maintenance_interval: Duration,
        persistence_interval: Duration,
    ) -> Self {
        Self {
            cache,
            maintenance_interval,
            persistence_interval,
            last_run: Arc::new(Mutex::new(LastRun::default())),
        }
    }

    // == Tick ==
    /// Runs whichever action is due according to the cache clock. Neither
    /// action is due on the first tick; the intervals start counting there.
    pub fn tick(&self) -> TickReport {
        let now = self.cache.clock().now();
        let (sweep_due, persist_due) = {
            let mut last_run = self.last_run.lock();
            let sweep_due = due(&mut last_run.sweep, now, self.maintenance_interval);
            let persist_due = due(&mut last_run.persist, now, self.persistence_interval);
            (sweep_due, persist_due)
        };

        let mut report = TickReport::default();
        if sweep_due {
            report.swept = Some(self.sweep());
        }
        if persist_due {
            report.persisted = self.persist();
        }
        report
    }

    // == Sweep ==
    /// Removes stale entries, cleans up to 70% if usage is above 90% of the
    /// ceiling, then publishes a statistics snapshot.
    pub fn sweep(&self) -> SweepReport {
        let expired = self.cache.invalidate_expired();
        let rebalanced = if self.cache.over_threshold() {
            self.cache.cleanup(None)
        } else {
            None
        };

        let statistics = self.cache.publish_statistics();
        debug!(
            "Maintenance sweep: {} expired, usage {}/{} bytes",
            expired.entries_removed, statistics.current_memory_usage, statistics.max_memory_usage
        );

        SweepReport {
            expired,
            rebalanced,
        }
    }

    // == Persist ==
    /// Saves the cache if auto-persistence is enabled. Failures are logged
    /// and reported as None.
    pub fn persist(&self) -> Option<usize> {
        match self.cache.persist() {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Auto-persistence failed: {}", e);
                None
            }
        }
    }
}

/// Marks an action as run at `now` if its interval has elapsed. The first
/// call only starts the interval.
fn due(last: &mut Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    match *last {
        None => {
            *last = Some(now);
            false
        }
        Some(previous) if now - previous >= to_chrono(interval) => {
            *last = Some(now);
            true
        }
        Some(_) => false,
    }
}

/// Spawns the background maintenance task.
///
/// The sweep runs every `maintenance_interval`; auto-persistence runs every
/// `persistence_interval` on the blocking pool. The task stops once `true`
/// is sent on `shutdown` or the sender is dropped.
///
/// # Example
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_maintenance_task(cache.clone(), sweep_every, persist_every, shutdown_rx);
/// // Later, during shutdown:
/// shutdown_tx.send(true).ok();
/// handle.await.ok();
/// ```
pub fn spawn_maintenance_task(
    cache: Arc<MediaCache>,
    maintenance_interval: Duration,
    persistence_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let scheduler = MaintenanceScheduler::new(cache, maintenance_interval, persistence_interval);

    tokio::spawn(async move {
        info!(
            "Starting maintenance task (sweep every {:?}, persist every {:?})",
            maintenance_interval, persistence_interval
        );

        let start = tokio::time::Instant::now();
        let mut sweep_timer = tokio::time::interval_at(start + maintenance_interval, maintenance_interval);
        let mut persist_timer =
            tokio::time::interval_at(start + persistence_interval, persistence_interval);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        persist_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = sweep_timer.tick() => {
                    scheduler.sweep();
                }
                _ = persist_timer.tick() => {
                    let scheduler = scheduler.clone();
                    match tokio::task::spawn_blocking(move || scheduler.persist()).await {
                        Ok(Some(count)) => debug!("Auto-persisted {} entries", count),
                        Ok(None) => {}
                        Err(e) => error!("Persistence task panicked: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Maintenance task stopping");
                        break;
                    }
                }
            }
        }
    })
}
