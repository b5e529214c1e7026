//! # Stats Export
//!
//! Combined cache, rate-limit and request statistics for operational
//! tooling. Nothing in the request path reads these snapshots.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::config::AppEnvironment;
use crate::rate_limit::RateLimitStats;
use crate::tracker::RequestStats;

/// Runtime metadata attached to every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentStats {
    pub environment: AppEnvironment,
    pub cache_enabled: bool,
    pub uptime_secs: f64,
}

/// Everything the client knows about itself at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveStats {
    pub cache: CacheStats,
    pub rate_limit: RateLimitStats,
    pub requests: RequestStats,
    pub environment: EnvironmentStats,
}

/// Flat gauges for a monitoring sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringMetrics {
    pub cache_hit_rate: f64,
    pub request_success_rate: f64,
    pub rate_limit_block_rate: f64,
    pub avg_response_time_ms: u64,
    pub active_cache_entries: usize,
    pub memory_usage_kb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    #[serde(flatten)]
    pub stats: ComprehensiveStats,
    pub timestamp: DateTime<Utc>,
    pub metrics: MonitoringMetrics,
}

impl MonitoringSnapshot {
    pub fn from_stats(stats: ComprehensiveStats, timestamp: DateTime<Utc>) -> Self {
        let metrics = MonitoringMetrics {
            cache_hit_rate: stats.cache.hit_rate,
            request_success_rate: stats.requests.success_rate,
            rate_limit_block_rate: stats.rate_limit.block_rate,
            avg_response_time_ms: stats.requests.avg_response_time_ms,
            active_cache_entries: stats.cache.total_entries,
            memory_usage_kb: (stats.cache.memory_usage as f64 / 1024.0).round() as u64,
        };

        Self {
            stats,
            timestamp,
            metrics,
        }
    }
}

/// Render a human-readable multi-section report
pub fn format_report(stats: &ComprehensiveStats) -> String {
    let rule = "═".repeat(50);
    let requests = &stats.requests;
    let cache = &stats.cache;
    let rate_limit = &stats.rate_limit;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "📊 Fetch Client Statistics");
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\n🚀 Request Statistics:");
    let _ = writeln!(out, "  Total Requests: {}", requests.total_requests);
    let _ = writeln!(out, "  Success Rate: {}%", requests.success_rate);
    let _ = writeln!(out, "  Failed Requests: {}", requests.failed_requests);
    let _ = writeln!(out, "  Retried Requests: {}", requests.retried_requests);
    let _ = writeln!(out, "  Total Retries: {}", requests.total_retries);
    let _ = writeln!(out, "  Avg Response Time: {}ms", requests.avg_response_time_ms);
    if let Some(fastest) = &requests.fastest_request {
        let _ = writeln!(out, "  Fastest Request: {} ({}ms)", fastest.url, fastest.duration_ms);
    }
    if let Some(slowest) = &requests.slowest_request {
        let _ = writeln!(out, "  Slowest Request: {} ({}ms)", slowest.url, slowest.duration_ms);
    }

    let _ = writeln!(out, "\n💾 Cache Statistics:");
    let _ = writeln!(
        out,
        "  Cache Enabled: {}",
        if stats.environment.cache_enabled { "✅" } else { "❌" }
    );
    let _ = writeln!(out, "  Total Entries: {}", cache.total_entries);
    let _ = writeln!(out, "  Hit Rate: {}%", cache.hit_rate);
    let _ = writeln!(out, "  Total Hits: {}", cache.total_hits);
    let _ = writeln!(out, "  Total Misses: {}", cache.total_misses);
    let _ = writeln!(
        out,
        "  Memory Usage: {:.2} KB",
        cache.memory_usage as f64 / 1024.0
    );

    let _ = writeln!(out, "\n🚧 Rate Limit Statistics:");
    let _ = writeln!(out, "  Total Requests: {}", rate_limit.total_requests);
    let _ = writeln!(out, "  Blocked Requests: {}", rate_limit.total_blocked);
    let _ = writeln!(out, "  Block Rate: {}%", rate_limit.block_rate);
    let _ = writeln!(out, "  Active Windows: {}", rate_limit.active_windows);

    let _ = writeln!(out, "\n⚙️  Environment:");
    let _ = writeln!(out, "  Environment: {}", stats.environment.environment);
    let _ = writeln!(out, "  Uptime: {}s", stats.environment.uptime_secs.round());

    if !requests.errors_by_kind.is_empty() {
        let _ = writeln!(out, "\n❌ Error Breakdown:");
        let sorted: BTreeMap<_, _> = requests.errors_by_kind.iter().collect();
        for (kind, count) in sorted {
            let _ = writeln!(out, "  {kind}: {count}");
        }
    }

    if !requests.requests_by_method.is_empty() {
        let _ = writeln!(out, "\n🔄 Requests by Method:");
        let sorted: BTreeMap<_, _> = requests.requests_by_method.iter().collect();
        for (method, count) in sorted {
            let _ = writeln!(out, "  {method}: {count}");
        }
    }

    let _ = write!(out, "{rule}");
    out
}
