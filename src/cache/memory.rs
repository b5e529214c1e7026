//! In-memory response cache backed by `DashMap`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::envelope::ActionResponse;

/// A cached envelope and its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: ActionResponse<Value>,
    pub created_at: Instant,
    pub ttl: Duration,
    pub key: String,
    pub url: String,
    pub hits: u64,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// An entry is live up to and including `created_at + ttl`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_sets: u64,
    pub total_evictions: u64,
    pub total_entries: usize,
    /// Hit percentage, rounded to 2 decimals
    pub hit_rate: f64,
    /// Approximate footprint: serialized key plus serialized envelope, in bytes
    pub memory_usage: usize,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
    pub most_hit_entry: Option<String>,
    pub avg_age_ms: u64,
}

/// TTL cache for successful GET envelopes
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl ResponseCache {
    /// Create a cache; a disabled cache never stores and never hits
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store an envelope, replacing any previous entry and resetting its hits
    pub fn set(&self, key: &str, data: ActionResponse<Value>, ttl: Duration, url: &str) {
        if !self.enabled {
            debug!(url = %url, "Caching disabled in development");
            return;
        }

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                created_at: Instant::now(),
                ttl,
                key: key.to_string(),
                url: url.to_string(),
                hits: 0,
            },
        );
        self.sets.fetch_add(1, Ordering::Relaxed);

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache SET");
    }

    /// Look up a live entry, removing it if it has expired
    pub fn get(&self, key: &str) -> Option<ActionResponse<Value>> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();

        // The shard guard must be released before removing the expired entry.
        match self.entries.get_mut(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache MISS");
                return None;
            }
            Some(mut entry) if !entry.is_expired(now) => {
                entry.hits += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, hits = entry.hits, "Cache HIT");
                return Some(entry.data.clone());
            }
            Some(_) => {}
        }

        if self.entries.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired and removed");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        None
    }

    /// Remove every entry whose key or URL matches `pattern`
    ///
    /// The pattern is a regular expression; if it does not compile it is
    /// matched as a plain substring instead.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let regex = Regex::new(pattern).ok();
        let matches = |text: &str| match &regex {
            Some(re) => re.is_match(text),
            None => text.contains(pattern),
        };

        let mut removed = 0;
        self.entries.retain(|key, entry| {
            let hit = matches(key) || matches(&entry.url);
            if hit {
                removed += 1;
            }
            !hit
        });
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);

        info!(removed = removed, pattern = %pattern, "Invalidated cache entries");
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        let size = self.entries.len();
        self.entries.clear();
        self.evictions.fetch_add(size as u64, Ordering::Relaxed);

        info!(cleared = size, "Cleared all cache entries");
    }

    /// Sweep entries past their own TTL, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);

        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired cache entries");
        }

        removed
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();

        let mut oldest: Option<(Instant, String)> = None;
        let mut newest: Option<(Instant, String)> = None;
        let mut most_hit: Option<(u64, String)> = None;
        let mut total_age = Duration::ZERO;
        let mut memory_usage = 0;
        let mut count = 0usize;

        for item in self.entries.iter() {
            let entry = item.value();
            count += 1;
            total_age += entry.age(now);

            memory_usage += serde_json::to_string(&entry.data)
                .map(|s| s.len())
                .unwrap_or(0)
                + serde_json::to_string(&entry.key)
                    .map(|s| s.len())
                    .unwrap_or(0);

            if oldest.as_ref().map_or(true, |(t, _)| entry.created_at < *t) {
                oldest = Some((entry.created_at, entry.key.clone()));
            }
            if newest.as_ref().map_or(true, |(t, _)| entry.created_at > *t) {
                newest = Some((entry.created_at, entry.key.clone()));
            }
            if most_hit.as_ref().map_or(true, |(h, _)| entry.hits > *h) {
                most_hit = Some((entry.hits, entry.key.clone()));
            }
        }

        let total_hits = self.hits.load(Ordering::Relaxed);
        let total_misses = self.misses.load(Ordering::Relaxed);
        let lookups = total_hits + total_misses;
        let hit_rate = if lookups > 0 {
            total_hits as f64 / lookups as f64 * 100.0
        } else {
            0.0
        };
        let avg_age_ms = if count > 0 {
            (total_age.as_millis() as f64 / count as f64).round() as u64
        } else {
            0
        };

        CacheStats {
            total_hits,
            total_misses,
            total_sets: self.sets.load(Ordering::Relaxed),
            total_evictions: self.evictions.load(Ordering::Relaxed),
            total_entries: count,
            hit_rate: round2(hit_rate),
            memory_usage,
            oldest_entry: oldest.map(|(_, k)| k),
            newest_entry: newest.map(|(_, k)| k),
            most_hit_entry: most_hit.map(|(_, k)| k),
            avg_age_ms,
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
