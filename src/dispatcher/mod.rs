//! # Request Dispatcher
//!
//! The single entry point that turns `(url, options)` into an
//! [`ActionResponse`]. One logical fetch runs through:
//!
//! 1. **Cache lookup**: GET requests are answered from the response cache
//!    when a live entry exists under the request fingerprint (or the caller's
//!    key).
//! 2. **Admission**: when rate limiting is requested, a refused call resolves
//!    immediately with a 429 envelope and never reaches the network.
//! 3. **Attempt loop**: up to `retries + 1` attempts, each bounded by its own
//!    timeout. A timed-out attempt drops its in-flight future and nothing
//!    else; the next attempt starts from a clean slate.
//! 4. **Write-through**: a successful GET is stored under its cache key.
//!
//! Every outcome, including decode failures and cancellations, is returned as
//! an envelope. `fetch` never yields a `Result::Err`.

pub mod backoff;
pub mod options;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{fingerprint, ResponseCache};
use crate::config::FetchConfig;
use crate::envelope::{extract_error_details, handle_error, ActionResponse};
use crate::error::{FetchError, FetchResult};
use crate::logging::log_fetch_failure;
use crate::rate_limit::SlidingWindowLimiter;
use crate::tracker::RequestTracker;
use crate::transport::{HttpTransport, TransportRequest};

pub use backoff::{backoff_delay, base_backoff, should_retry};
pub use options::{CacheOptions, FetchOptions, RateLimitOptions, RetryCondition};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Executes fetches against shared cache, limiter and tracker instances
#[derive(Debug, Clone)]
pub struct Dispatcher {
    cache: Arc<ResponseCache>,
    rate_limiter: Arc<SlidingWindowLimiter>,
    tracker: Arc<RequestTracker>,
    transport: Arc<dyn HttpTransport>,
    config: Arc<FetchConfig>,
}

impl Dispatcher {
    pub fn new(
        cache: Arc<ResponseCache>,
        rate_limiter: Arc<SlidingWindowLimiter>,
        tracker: Arc<RequestTracker>,
        transport: Arc<dyn HttpTransport>,
        config: Arc<FetchConfig>,
    ) -> Self {
        Self {
            cache,
            rate_limiter,
            tracker,
            transport,
            config,
        }
    }

    /// Execute one logical fetch and resolve to an envelope
    pub async fn fetch<T>(&self, url: &str, options: FetchOptions) -> ActionResponse<T>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let method = options.method;

        self.tracker.track_request(method);

        let use_cache = options.uses_cache();
        let cache_key = options
            .cache
            .as_ref()
            .and_then(|c| c.key.clone())
            .unwrap_or_else(|| fingerprint(method, url, options.body.as_ref(), &options.headers));

        if use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                match decode_envelope::<T>(cached) {
                    Ok(envelope) => {
                        self.tracker.track_success(url, started.elapsed());
                        debug!(
                            request_id = %request_id,
                            method = %method,
                            url = %url,
                            cache_key = %cache_key,
                            "Cache hit"
                        );
                        return envelope;
                    }
                    Err(e) => {
                        warn!(
                            request_id = %request_id,
                            url = %url,
                            cache_key = %cache_key,
                            error = %e,
                            "Cached response does not match the requested shape, refetching"
                        );
                    }
                }
            }
        }

        if let Some(limit) = &options.rate_limit {
            let key = limit.key.as_deref().unwrap_or(url);
            if !self
                .rate_limiter
                .can_make_request(key, limit.max_requests, limit.window)
            {
                let retry_after = self
                    .rate_limiter
                    .retry_after(key, limit.max_requests, limit.window);
                let error = FetchError::rate_limited(retry_after.as_millis() as u64);
                self.tracker.track_error(&error, false);
                warn!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    rate_limit_key = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "🚫 Rate limit exceeded"
                );
                return handle_error(&error);
            }
        }

        let request = match build_request(url, &options) {
            Ok(request) => request,
            Err(e) => {
                self.tracker.track_error(&e, false);
                log_fetch_failure(request_id, method.as_str(), url, &e, elapsed_ms(started), false);
                return handle_error(&e);
            }
        };

        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());
        let retries = options.retries.unwrap_or(self.config.retries);
        let retry_delay = options
            .retry_delay
            .unwrap_or_else(|| self.config.retry_delay());
        let total_attempts = retries.saturating_add(1);

        let mut was_retried = false;
        let mut last_error = None;

        for attempt in 0..total_attempts {
            if attempt > 0 {
                self.tracker.track_retry();
                was_retried = true;
            }

            debug!(
                request_id = %request_id,
                method = %method,
                url = %url,
                attempt = attempt + 1,
                total_attempts = total_attempts,
                transport = self.transport.name(),
                "Attempt started"
            );

            match self.attempt::<T>(&request, timeout).await {
                Ok((envelope, raw)) => {
                    let duration = started.elapsed();
                    self.tracker.track_success(url, duration);
                    if was_retried {
                        self.tracker.track_retried_success();
                    }

                    if use_cache {
                        let ttl = options
                            .cache
                            .as_ref()
                            .and_then(|c| c.ttl)
                            .unwrap_or_else(|| self.config.cache_ttl());
                        self.cache.set(&cache_key, raw, ttl, url);
                    }

                    info!(
                        request_id = %request_id,
                        method = %method,
                        url = %url,
                        attempts = attempt + 1,
                        duration_ms = duration.as_millis() as u64,
                        "✅ Request completed"
                    );
                    return envelope;
                }
                Err(e) => {
                    if e.is_cancellation() {
                        warn!(
                            request_id = %request_id,
                            method = %method,
                            url = %url,
                            attempt = attempt + 1,
                            timeout_ms = timeout.as_millis() as u64,
                            "⏱️ Attempt timed out"
                        );
                    } else {
                        error!(
                            request_id = %request_id,
                            method = %method,
                            url = %url,
                            attempt = attempt + 1,
                            error = %e,
                            error_kind = %e.kind(),
                            "Attempt failed"
                        );
                    }

                    let may_retry = attempt < retries
                        && should_retry(&e, attempt + 1, options.retry_condition.as_ref());
                    last_error = Some(e);

                    if !may_retry {
                        break;
                    }

                    let delay = backoff_delay(retry_delay, attempt, self.config.max_jitter());
                    debug!(
                        request_id = %request_id,
                        url = %url,
                        next_attempt = attempt + 2,
                        delay_ms = delay.as_millis() as u64,
                        "🔄 Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| FetchError::network("request finished without an attempt"));
        self.tracker.track_error(&error, was_retried);
        log_fetch_failure(
            request_id,
            method.as_str(),
            url,
            &error,
            elapsed_ms(started),
            was_retried,
        );
        handle_error(&error)
    }

    /// One bounded attempt: send, check status, decode
    ///
    /// Returns the typed envelope and the raw one for the cache.
    async fn attempt<T>(
        &self,
        request: &TransportRequest,
        timeout: Duration,
    ) -> FetchResult<(ActionResponse<T>, ActionResponse<Value>)>
    where
        T: DeserializeOwned,
    {
        let response = match tokio::time::timeout(timeout, self.transport.send(request.clone())).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::cancelled(
                    request.url.clone(),
                    timeout.as_millis() as u64,
                ))
            }
        };

        if !response.is_success() {
            return Err(FetchError::status(response.status, &response.status_text)
                .with_details(extract_error_details(&response.body)));
        }

        let raw: ActionResponse<Value> = serde_json::from_str(&response.body)?;
        let envelope = decode_envelope::<T>(raw.clone())?;
        Ok((envelope, raw))
    }
}

/// Merge default JSON headers under the caller's and serialize the body
fn build_request(url: &str, options: &FetchOptions) -> FetchResult<TransportRequest> {
    let mut headers = BTreeMap::new();
    for name in ["Content-Type", "Accept"] {
        if !options
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(name))
        {
            headers.insert(name.to_string(), JSON_CONTENT_TYPE.to_string());
        }
    }
    headers.extend(options.headers.clone());

    let body = options
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| FetchError::InvalidRequest(format!("unserializable request body: {e}")))?;

    Ok(TransportRequest {
        method: options.method,
        url: url.to_string(),
        headers,
        body,
    })
}

/// Re-type the data of an untyped envelope
fn decode_envelope<T>(raw: ActionResponse<Value>) -> FetchResult<ActionResponse<T>>
where
    T: DeserializeOwned,
{
    let data = raw.data.map(serde_json::from_value).transpose()?;
    Ok(ActionResponse {
        success: raw.success,
        data,
        status: raw.status,
        error: raw.error,
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
