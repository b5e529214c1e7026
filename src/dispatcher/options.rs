//! Per-call fetch options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::FetchError;
use crate::transport::HttpMethod;

/// Caller-supplied retry eligibility test: `(error, attempt_number) -> retry?`
///
/// `attempt_number` is 1-based and names the attempt that just failed.
pub type RetryCondition = Arc<dyn Fn(&FetchError, u32) -> bool + Send + Sync>;

/// Response caching controls (GET only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// `false` bypasses the cache for both lookup and write-through
    pub enabled: bool,
    /// Overrides the configured default TTL
    pub ttl: Option<Duration>,
    /// Caller-owned key used verbatim instead of the request fingerprint
    pub key: Option<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: None,
            key: None,
        }
    }
}

impl CacheOptions {
    pub fn enabled() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Opt-in admission control for a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitOptions {
    pub max_requests: u32,
    pub window: Duration,
    /// Defaults to the request URL
    pub key: Option<String>,
}

impl RateLimitOptions {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Options for a single logical fetch
///
/// Unset timeout/retry fields fall back to the client's
/// [`FetchConfig`](crate::config::FetchConfig).
#[derive(Clone, Default)]
pub struct FetchOptions {
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub retry_condition: Option<RetryCondition>,
    pub cache: Option<CacheOptions>,
    pub rate_limit: Option<RateLimitOptions>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("retry_condition", &self.retry_condition.is_some())
            .field("cache", &self.cache)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::new().method(HttpMethod::Post).body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::new().method(HttpMethod::Put).body(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::new().method(HttpMethod::Patch).body(body)
    }

    pub fn delete() -> Self {
        Self::new().method(HttpMethod::Delete)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&FetchError, u32) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn no_cache(self) -> Self {
        self.cache(CacheOptions::disabled())
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitOptions) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Whether this call reads from and writes to the response cache
    pub(crate) fn uses_cache(&self) -> bool {
        self.method == HttpMethod::Get && self.cache.as_ref().map_or(true, |c| c.enabled)
    }
}
