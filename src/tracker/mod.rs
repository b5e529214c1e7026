//! # Request Tracker
//!
//! Passive recorder of request outcomes. Nothing here feeds back into control
//! flow; the dispatcher only writes to it and the stats surface only reads.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::memory::round2;
use crate::error::{ErrorKind, FetchError};
use crate::transport::HttpMethod;

/// A fastest/slowest request exemplar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestExemplar {
    pub url: String,
    pub duration_ms: u64,
}

/// Aggregated request statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Logical requests that needed at least one retry, whatever the outcome
    pub retried_requests: u64,
    /// Raw count of re-issued attempts
    pub total_retries: u64,
    /// Success percentage, rounded to 2 decimals
    pub success_rate: f64,
    pub avg_response_time_ms: u64,
    pub slowest_request: Option<RequestExemplar>,
    pub fastest_request: Option<RequestExemplar>,
    pub errors_by_kind: HashMap<ErrorKind, u64>,
    pub requests_by_method: HashMap<HttpMethod, u64>,
}

#[derive(Debug, Default)]
struct TrackerState {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    retried_requests: u64,
    total_retries: u64,
    total_duration: Duration,
    slowest_request: Option<RequestExemplar>,
    fastest_request: Option<RequestExemplar>,
    errors_by_kind: HashMap<ErrorKind, u64>,
    requests_by_method: HashMap<HttpMethod, u64>,
}

/// Thread-safe request outcome recorder
#[derive(Debug, Default)]
pub struct RequestTracker {
    state: Mutex<TrackerState>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one logical request (not one attempt)
    pub fn track_request(&self, method: HttpMethod) {
        let mut state = self.state.lock();
        state.total_requests += 1;
        *state.requests_by_method.entry(method).or_insert(0) += 1;
    }

    pub fn track_success(&self, url: &str, duration: Duration) {
        let duration_ms = duration.as_millis() as u64;
        let mut state = self.state.lock();
        state.successful_requests += 1;
        state.total_duration += duration;

        if state
            .fastest_request
            .as_ref()
            .map_or(true, |fastest| duration_ms < fastest.duration_ms)
        {
            state.fastest_request = Some(RequestExemplar {
                url: url.to_string(),
                duration_ms,
            });
        }

        if state
            .slowest_request
            .as_ref()
            .map_or(true, |slowest| duration_ms > slowest.duration_ms)
        {
            state.slowest_request = Some(RequestExemplar {
                url: url.to_string(),
                duration_ms,
            });
        }
    }

    pub fn track_error(&self, error: &FetchError, was_retried: bool) {
        let mut state = self.state.lock();
        state.failed_requests += 1;
        if was_retried {
            state.retried_requests += 1;
        }
        *state.errors_by_kind.entry(error.kind()).or_insert(0) += 1;
    }

    /// Count one re-issued attempt
    pub fn track_retry(&self) {
        self.state.lock().total_retries += 1;
    }

    /// Count a logical request that succeeded only after retrying
    ///
    /// Failed requests are counted through [`track_error`](Self::track_error).
    pub fn track_retried_success(&self) {
        self.state.lock().retried_requests += 1;
    }

    pub fn stats(&self) -> RequestStats {
        let state = self.state.lock();

        let success_rate = if state.total_requests > 0 {
            state.successful_requests as f64 / state.total_requests as f64 * 100.0
        } else {
            0.0
        };
        let avg_response_time_ms = if state.successful_requests > 0 {
            (state.total_duration.as_millis() as f64 / state.successful_requests as f64).round()
                as u64
        } else {
            0
        };

        RequestStats {
            total_requests: state.total_requests,
            successful_requests: state.successful_requests,
            failed_requests: state.failed_requests,
            retried_requests: state.retried_requests,
            total_retries: state.total_retries,
            success_rate: round2(success_rate),
            avg_response_time_ms,
            slowest_request: state.slowest_request.clone(),
            fastest_request: state.fastest_request.clone(),
            errors_by_kind: state.errors_by_kind.clone(),
            requests_by_method: state.requests_by_method.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_rates() {
        let tracker = RequestTracker::new();
        tracker.track_request(HttpMethod::Get);
        tracker.track_request(HttpMethod::Get);
        tracker.track_request(HttpMethod::Post);
        tracker.track_success("/api/users", Duration::from_millis(100));
        tracker.track_success("/api/tags", Duration::from_millis(300));
        tracker.track_error(&FetchError::status(404, "Not Found"), false);

        let stats = tracker.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.successful_requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(stats.avg_response_time_ms, 200);
        assert_eq!(stats.requests_by_method[&HttpMethod::Get], 2);
        assert_eq!(stats.requests_by_method[&HttpMethod::Post], 1);
        assert_eq!(stats.errors_by_kind[&ErrorKind::TransportStatus], 1);
    }

    #[test]
    fn test_exemplars_use_strict_comparison() {
        let tracker = RequestTracker::new();
        tracker.track_success("/first", Duration::from_millis(50));
        tracker.track_success("/second", Duration::from_millis(50));
        tracker.track_success("/slow", Duration::from_millis(900));

        let stats = tracker.stats();
        assert_eq!(stats.fastest_request.unwrap().url, "/first");
        assert_eq!(
            stats.slowest_request,
            Some(RequestExemplar {
                url: "/slow".to_string(),
                duration_ms: 900
            })
        );
    }

    #[test]
    fn test_retry_accounting() {
        let tracker = RequestTracker::new();
        tracker.track_retry();
        tracker.track_retry();
        tracker.track_error(&FetchError::cancelled("/api", 5000), true);
        tracker.track_error(&FetchError::rate_limited(100), false);

        let stats = tracker.stats();
        assert_eq!(stats.total_retries, 2);
        assert_eq!(stats.retried_requests, 1);
        assert_eq!(stats.errors_by_kind[&ErrorKind::Cancellation], 1);
        assert_eq!(stats.errors_by_kind[&ErrorKind::RateLimitExceeded], 1);
    }

    #[test]
    fn test_retried_success_counts_as_retried() {
        let tracker = RequestTracker::new();
        tracker.track_request(HttpMethod::Get);
        tracker.track_retry();
        tracker.track_success("/api/tags", Duration::from_millis(20));
        tracker.track_retried_success();

        let stats = tracker.stats();
        assert_eq!(stats.retried_requests, 1);
        assert_eq!(stats.total_retries, 1);
        assert_eq!(stats.failed_requests, 0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = RequestTracker::new().stats();
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_response_time_ms, 0);
        assert!(stats.fastest_request.is_none());
        assert!(stats.errors_by_kind.is_empty());
    }
}
