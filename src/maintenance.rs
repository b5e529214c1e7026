//! # Maintenance Sweeps
//!
//! Periodic background cleanup of expired cache entries and stale
//! rate-limit windows.
//!
//! ## Lifecycle
//!
//! - Created by [`FetchClient::start_maintenance`](crate::client::FetchClient::start_maintenance)
//! - Runs on a tokio task; the first sweep happens one full interval after start
//! - Stopped through [`MaintenanceHandle::shutdown`], which waits for the task to exit
//!
//! Dropping the handle without calling `shutdown` also stops the loop at its
//! next wake-up, since the shutdown channel closes.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::rate_limit::SlidingWindowLimiter;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub cache_entries_removed: usize,
    pub rate_limit_windows_removed: usize,
}

/// Run one cleanup pass over the cache and the rate limiter
pub fn run_sweep(cache: &ResponseCache, rate_limiter: &SlidingWindowLimiter) -> SweepReport {
    let report = SweepReport {
        cache_entries_removed: cache.cleanup(),
        rate_limit_windows_removed: rate_limiter.cleanup(),
    };

    if report.cache_entries_removed > 0 || report.rate_limit_windows_removed > 0 {
        info!(
            cache_entries_removed = report.cache_entries_removed,
            rate_limit_windows_removed = report.rate_limit_windows_removed,
            "🧹 Maintenance sweep completed"
        );
    } else {
        debug!("Maintenance sweep found nothing to remove");
    }

    report
}

/// Background sweeper over shared cache and limiter instances
#[derive(Debug, Clone)]
pub struct MaintenanceTask {
    cache: Arc<ResponseCache>,
    rate_limiter: Arc<SlidingWindowLimiter>,
    interval: Duration,
}

impl MaintenanceTask {
    pub fn new(
        cache: Arc<ResponseCache>,
        rate_limiter: Arc<SlidingWindowLimiter>,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            rate_limiter,
            interval,
        }
    }

    /// Spawn the sweep loop on the current runtime
    pub fn spawn(self) -> MaintenanceHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join_handle = tokio::spawn(self.run(shutdown_rx));
        MaintenanceHandle {
            shutdown_tx,
            join_handle: Some(join_handle),
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        // interval() yields immediately on the first tick; sweeps start one period in
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = period.as_millis() as u64,
            "Starting maintenance sweeper"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_sweep(&self.cache, &self.rate_limiter);
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Maintenance sweeper stopped");
    }
}

/// Owner handle of a running sweep loop
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Maintenance sweeper exited abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ActionResponse;
    use serde_json::json;

    fn components() -> (Arc<ResponseCache>, Arc<SlidingWindowLimiter>) {
        (
            Arc::new(ResponseCache::new(true)),
            Arc::new(SlidingWindowLimiter::new(Duration::from_secs(3600))),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweep_removes_expired_entries() {
        let (cache, limiter) = components();
        cache.set(
            "GET:/api/tags::{}",
            ActionResponse::success(json!([])),
            Duration::from_secs(1),
            "/api/tags",
        );
        cache.set(
            "GET:/api/users::{}",
            ActionResponse::success(json!([])),
            Duration::from_secs(600),
            "/api/users",
        );

        tokio::time::advance(Duration::from_secs(2)).await;

        let report = run_sweep(&cache, &limiter);
        assert_eq!(report.cache_entries_removed, 1);
        assert_eq!(report.rate_limit_windows_removed, 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_and_shutdown() {
        let (cache, limiter) = components();
        cache.set(
            "k",
            ActionResponse::success(json!(1)),
            Duration::from_secs(5),
            "/api/k",
        );

        let handle =
            MaintenanceTask::new(cache.clone(), limiter, Duration::from_secs(60)).spawn();
        assert!(handle.is_running());

        // Entry expires at 5s but the first sweep only runs at 60s
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len(), 0);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let (cache, limiter) = components();
        let handle = MaintenanceTask::new(cache, limiter, Duration::from_secs(300)).spawn();
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown should not wait for the next tick");
    }
}
