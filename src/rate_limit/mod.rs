//! # Sliding-Window Rate Limiter
//!
//! Per-key admission control over a trailing time window. Each key keeps the
//! timestamps of its admitted requests; a request is refused once the number
//! of timestamps still inside the window reaches the quota.
//!
//! Refused attempts are not recorded, so only admitted requests occupy quota
//! slots.
//!
//! ```rust
//! use devflow_fetch::rate_limit::SlidingWindowLimiter;
//! use std::time::Duration;
//!
//! let limiter = SlidingWindowLimiter::new(Duration::from_secs(3600));
//! let window = Duration::from_secs(1);
//!
//! assert!(limiter.can_make_request("/api/tags", 2, window));
//! assert!(limiter.can_make_request("/api/tags", 2, window));
//! assert!(!limiter.can_make_request("/api/tags", 2, window));
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::memory::round2;

/// Point-in-time limiter statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStats {
    /// Admission checks evaluated
    pub total_requests: u64,
    pub total_blocked: u64,
    /// Blocked percentage, rounded to 2 decimals
    pub block_rate: f64,
    /// Keys holding at least one retained timestamp
    pub active_windows: usize,
    pub avg_requests_per_window: f64,
}

/// Per-key sliding-window admission control
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    stale_after: Duration,
    total_requests: AtomicU64,
    total_blocked: AtomicU64,
}

impl SlidingWindowLimiter {
    /// Create a limiter whose sweep drops windows idle for longer than `stale_after`
    pub fn new(stale_after: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            stale_after,
            total_requests: AtomicU64::new(0),
            total_blocked: AtomicU64::new(0),
        }
    }

    /// Admit or refuse one request for `key`
    ///
    /// Pruning, the quota check and recording the admitted timestamp happen
    /// under a single shard lock.
    pub fn can_make_request(&self, key: &str, max_requests: u32, window: Duration) -> bool {
        let now = Instant::now();
        let mut timestamps = self.windows.entry(key.to_string()).or_default();

        prune(&mut timestamps, now, window);
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if timestamps.len() >= max_requests as usize {
            self.total_blocked.fetch_add(1, Ordering::Relaxed);
            warn!(
                key = %key,
                live = timestamps.len(),
                max_requests = max_requests,
                "Rate limit exceeded"
            );
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Time until the oldest live timestamp leaves the window
    ///
    /// Zero when the key is below quota.
    pub fn retry_after(&self, key: &str, max_requests: u32, window: Duration) -> Duration {
        let now = Instant::now();
        let Some(timestamps) = self.windows.get(key) else {
            return Duration::ZERO;
        };

        let mut live = timestamps
            .iter()
            .filter(|t| now.saturating_duration_since(**t) < window);
        let Some(oldest) = live.next() else {
            return Duration::ZERO;
        };
        if 1 + live.count() < max_requests as usize {
            return Duration::ZERO;
        }

        window.saturating_sub(now.saturating_duration_since(*oldest))
    }

    /// Drop windows that are empty or whose newest timestamp is stale
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();

        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) <= self.stale_after)
        });

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed = removed, "Cleaned up old rate limit windows");
        }
        removed
    }

    pub fn stats(&self) -> RateLimitStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_blocked = self.total_blocked.load(Ordering::Relaxed);

        let (active_windows, retained) = self
            .windows
            .iter()
            .filter(|w| !w.value().is_empty())
            .fold((0usize, 0usize), |(windows, total), w| {
                (windows + 1, total + w.value().len())
            });

        let block_rate = if total_requests > 0 {
            total_blocked as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };
        let avg_requests_per_window = if active_windows > 0 {
            retained as f64 / active_windows as f64
        } else {
            0.0
        };

        RateLimitStats {
            total_requests,
            total_blocked,
            block_rate: round2(block_rate),
            active_windows,
            avg_requests_per_window: round2(avg_requests_per_window),
        }
    }
}

/// Drop timestamps that have left the trailing window
fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    // Admission order keeps the deque sorted oldest-first.
    while timestamps
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= window)
    {
        timestamps.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_quota_then_refusal_then_recovery() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        let window = Duration::from_millis(1000);

        assert!(limiter.can_make_request("k", 3, window));
        assert!(limiter.can_make_request("k", 3, window));
        assert!(limiter.can_make_request("k", 3, window));
        assert!(!limiter.can_make_request("k", 3, window));

        tokio::time::advance(window).await;
        assert!(limiter.can_make_request("k", 3, window));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusals_do_not_occupy_slots() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        let window = Duration::from_millis(1000);

        assert!(limiter.can_make_request("k", 1, window));
        for _ in 0..5 {
            assert!(!limiter.can_make_request("k", 1, window));
        }
        assert_eq!(limiter.windows.get("k").unwrap().len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        let window = Duration::from_secs(5);

        assert!(limiter.can_make_request("/api/users", 1, window));
        assert!(limiter.can_make_request("/api/tags", 1, window));
        assert!(!limiter.can_make_request("/api/users", 1, window));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        let window = Duration::from_millis(5000);

        assert_eq!(limiter.retry_after("k", 1, window), Duration::ZERO);
        assert!(limiter.can_make_request("k", 1, window));

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(
            limiter.retry_after("k", 1, window),
            Duration::from_millis(3500)
        );
        assert_eq!(limiter.retry_after("k", 2, window), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60));
        let window = Duration::from_secs(1);

        limiter.can_make_request("old", 5, window);
        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.can_make_request("fresh", 5, window);

        assert_eq!(limiter.cleanup(), 1);
        assert!(limiter.windows.contains_key("fresh"));
        assert!(!limiter.windows.contains_key("old"));
    }

    #[test]
    fn test_stats() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        let window = Duration::from_secs(60);

        limiter.can_make_request("a", 2, window);
        limiter.can_make_request("a", 2, window);
        limiter.can_make_request("a", 2, window);
        limiter.can_make_request("b", 2, window);

        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.total_blocked, 1);
        assert_eq!(stats.block_rate, 25.0);
        assert_eq!(stats.active_windows, 2);
        assert_eq!(stats.avg_requests_per_window, 1.5);
    }

    #[test]
    fn test_zero_quota_always_refuses() {
        let limiter = SlidingWindowLimiter::new(HOUR);
        assert!(!limiter.can_make_request("k", 0, Duration::from_secs(1)));
        assert_eq!(limiter.stats().active_windows, 0);
    }
}
