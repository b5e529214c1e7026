//! # Fetch Client
//!
//! Composition root. A `FetchClient` owns exactly one cache, one rate
//! limiter and one request tracker and hands shared references to the
//! dispatcher and the maintenance sweeper. Two clients never share state.
//!
//! ```rust,no_run
//! use devflow_fetch::{FetchClient, FetchConfig, FetchOptions};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FetchClient::with_reqwest(FetchConfig::load()?)?;
//! let maintenance = client.start_maintenance();
//!
//! let response = client.fetch_path::<Value>("/users", FetchOptions::get()).await;
//! if !response.success {
//!     eprintln!("{:?}", response.error_message());
//! }
//!
//! maintenance.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::config::FetchConfig;
use crate::dispatcher::{Dispatcher, FetchOptions};
use crate::envelope::ActionResponse;
use crate::error::FetchResult;
use crate::maintenance::{self, MaintenanceHandle, MaintenanceTask, SweepReport};
use crate::rate_limit::SlidingWindowLimiter;
use crate::stats::{self, ComprehensiveStats, EnvironmentStats, MonitoringSnapshot};
use crate::tracker::RequestTracker;
use crate::transport::{HttpTransport, ReqwestTransport};

#[derive(Debug, Clone)]
pub struct FetchClient {
    config: Arc<FetchConfig>,
    cache: Arc<ResponseCache>,
    rate_limiter: Arc<SlidingWindowLimiter>,
    tracker: Arc<RequestTracker>,
    dispatcher: Dispatcher,
    started_at: Instant,
}

impl FetchClient {
    /// Build a client over an arbitrary transport
    pub fn new(config: FetchConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(ResponseCache::new(config.cache_enabled()));
        let rate_limiter = Arc::new(SlidingWindowLimiter::new(config.rate_limit_stale_after()));
        let tracker = Arc::new(RequestTracker::new());

        let dispatcher = Dispatcher::new(
            cache.clone(),
            rate_limiter.clone(),
            tracker.clone(),
            transport.clone(),
            config.clone(),
        );

        info!(
            environment = %config.environment,
            cache_enabled = cache.is_enabled(),
            transport = transport.name(),
            api_base_url = %config.api_base_url,
            "🔧 Fetch client initialized"
        );

        Self {
            config,
            cache,
            rate_limiter,
            tracker,
            dispatcher,
            started_at: Instant::now(),
        }
    }

    /// Build a client over a fresh reqwest connection pool
    pub fn with_reqwest(config: FetchConfig) -> FetchResult<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &SlidingWindowLimiter {
        &self.rate_limiter
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetch an absolute URL
    pub async fn fetch<T>(&self, url: &str, options: FetchOptions) -> ActionResponse<T>
    where
        T: DeserializeOwned,
    {
        self.dispatcher.fetch(url, options).await
    }

    /// Fetch a path relative to the configured API base url
    pub async fn fetch_path<T>(&self, path: &str, options: FetchOptions) -> ActionResponse<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url_for(path);
        self.dispatcher.fetch(&url, options).await
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Spawn the periodic cache/limiter sweep
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_maintenance(&self) -> MaintenanceHandle {
        MaintenanceTask::new(
            self.cache.clone(),
            self.rate_limiter.clone(),
            self.config.sweep_interval(),
        )
        .spawn()
    }

    /// Run one sweep immediately
    pub fn run_sweep(&self) -> SweepReport {
        maintenance::run_sweep(&self.cache, &self.rate_limiter)
    }

    pub fn all_stats(&self) -> ComprehensiveStats {
        ComprehensiveStats {
            cache: self.cache.stats(),
            rate_limit: self.rate_limiter.stats(),
            requests: self.tracker.stats(),
            environment: EnvironmentStats {
                environment: self.config.environment,
                cache_enabled: self.cache.is_enabled(),
                uptime_secs: self.started_at.elapsed().as_secs_f64(),
            },
        }
    }

    pub fn monitoring_snapshot(&self) -> MonitoringSnapshot {
        MonitoringSnapshot::from_stats(self.all_stats(), Utc::now())
    }

    /// Emit the human-readable report at info level
    pub fn print_stats(&self) {
        info!("\n{}", stats::format_report(&self.all_stats()));
    }

    /// Emit the full snapshot as one structured JSON field
    pub fn log_detailed_stats(&self) {
        match serde_json::to_string(&self.all_stats()) {
            Ok(json) => info!(stats = %json, "📊 Detailed fetch client statistics"),
            Err(e) => warn!(error = %e, "Failed to serialize fetch client statistics"),
        }
    }
}
