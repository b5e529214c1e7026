//! Retry eligibility and exponential backoff with jitter.

use std::time::Duration;

use super::options::RetryCondition;
use crate::error::FetchError;

/// Deterministic part of the backoff: `base * 2^attempt`
///
/// `attempt` is the 0-based index of the attempt that just failed.
pub fn base_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Full backoff: `base * 2^attempt` plus uniform jitter in `[0, max_jitter)`
pub fn backoff_delay(base: Duration, attempt: u32, max_jitter: Duration) -> Duration {
    let jitter_ms = max_jitter.as_millis() as u64;
    let jitter = if jitter_ms > 0 {
        Duration::from_millis(fastrand::u64(0..jitter_ms))
    } else {
        Duration::ZERO
    };

    base_backoff(base, attempt).saturating_add(jitter)
}

/// Decide whether a failed attempt may be re-issued
///
/// Cancellations are never retried. Otherwise a caller-supplied condition
/// replaces the default classification entirely.
pub fn should_retry(error: &FetchError, attempt: u32, condition: Option<&RetryCondition>) -> bool {
    if error.is_cancellation() {
        return false;
    }

    match condition {
        Some(condition) => condition(error, attempt),
        None => error.is_retryable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_base_backoff_doubles() {
        let base = Duration::from_millis(1000);
        assert_eq!(base_backoff(base, 0), Duration::from_millis(1000));
        assert_eq!(base_backoff(base, 1), Duration::from_millis(2000));
        assert_eq!(base_backoff(base, 2), Duration::from_millis(4000));
    }

    #[test]
    fn test_base_backoff_saturates() {
        let base = Duration::from_secs(u64::MAX / 2);
        assert_eq!(base_backoff(base, 40), Duration::MAX);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let base = Duration::from_millis(1000);
        let jitter = Duration::from_millis(1000);
        for attempt in 0..3 {
            for _ in 0..100 {
                let delay = backoff_delay(base, attempt, jitter);
                let floor = base_backoff(base, attempt);
                assert!(delay >= floor);
                assert!(delay < floor + jitter);
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let delay = backoff_delay(Duration::from_millis(50), 3, Duration::ZERO);
        assert_eq!(delay, Duration::from_millis(400));
    }

    #[test]
    fn test_default_classification() {
        assert!(should_retry(&FetchError::status(503, "Service Unavailable"), 1, None));
        assert!(!should_retry(&FetchError::status(404, "Not Found"), 1, None));
        assert!(should_retry(&FetchError::network("reset"), 1, None));
        assert!(!should_retry(&FetchError::cancelled("/api", 10), 1, None));
    }

    #[test]
    fn test_custom_condition_overrides_default() {
        let never: RetryCondition = Arc::new(|_, _| false);
        assert!(!should_retry(&FetchError::status(503, "Service Unavailable"), 1, Some(&never)));

        let on_404: RetryCondition = Arc::new(|e, _| e.http_status() == Some(404));
        assert!(should_retry(&FetchError::status(404, "Not Found"), 1, Some(&on_404)));
    }

    #[test]
    fn test_custom_condition_cannot_retry_cancellation() {
        let always: RetryCondition = Arc::new(|_, _| true);
        assert!(!should_retry(&FetchError::cancelled("/api", 10), 1, Some(&always)));
    }

    #[test]
    fn test_condition_sees_attempt_number() {
        let first_only: RetryCondition = Arc::new(|_, attempt| attempt < 2);
        let error = FetchError::network("reset");
        assert!(should_retry(&error, 1, Some(&first_only)));
        assert!(!should_retry(&error, 2, Some(&first_only)));
    }
}
