//! # Fetch Configuration
//!
//! Defaults for every dispatcher knob plus the application environment that
//! decides whether response caching is active.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use devflow_fetch::config::FetchConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Defaults -> config/devflow-fetch.toml -> DEVFLOW_FETCH_* variables
//! let config = FetchConfig::load()?;
//!
//! println!("API base: {}", config.api_base_url);
//! println!("Timeout: {:?}", config.timeout());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};

/// Deployment environment of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    /// Interactive development, caching disabled so responses are always live
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Test => "test",
            AppEnvironment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, AppEnvironment::Development)
    }

    /// Detect the environment from `DEVFLOW_ENV`, `APP_ENV` or `NODE_ENV`
    ///
    /// Unknown names fall back to development.
    pub fn detect() -> Self {
        std::env::var("DEVFLOW_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .or_else(|_| std::env::var("NODE_ENV"))
            .ok()
            .and_then(|name| name.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppEnvironment {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnvironment::Development),
            "test" => Ok(AppEnvironment::Test),
            "production" | "prod" => Ok(AppEnvironment::Production),
            other => Err(ConfigurationError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Dispatcher, cache and sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Base URL the typed API surface joins paths onto
    pub api_base_url: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Base backoff in milliseconds, doubled per attempt
    pub retry_delay_ms: u64,
    /// Upper bound (exclusive) of the random jitter added to each backoff
    pub max_jitter_ms: u64,
    /// Default TTL of cached GET responses
    pub cache_ttl_ms: u64,
    /// Interval of the background cache/limiter sweep
    pub sweep_interval_ms: u64,
    /// Rate-limit windows whose newest timestamp is older than this are dropped
    pub rate_limit_stale_after_ms: u64,
    pub environment: AppEnvironment,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3137/api".to_string(),
            timeout_ms: 5_000,
            retries: 0,
            retry_delay_ms: 1_000,
            max_jitter_ms: 1_000,
            cache_ttl_ms: 300_000,
            sweep_interval_ms: 300_000,
            rate_limit_stale_after_ms: 3_600_000,
            environment: AppEnvironment::Development,
        }
    }
}

impl FetchConfig {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Self> {
        loader::ConfigLoader::new().load()
    }

    /// Defaults for a given environment (used heavily by tests)
    pub fn for_environment(environment: AppEnvironment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn rate_limit_stale_after(&self) -> Duration {
        Duration::from_millis(self.rate_limit_stale_after_ms)
    }

    /// Caching is disabled in development so responses are always live
    pub fn cache_enabled(&self) -> bool {
        !self.environment.is_development()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "api_base_url",
                "",
                "base url must not be empty",
            ));
        }

        if self.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "timeout_ms",
                "0",
                "timeout must be greater than 0",
            ));
        }

        if self.cache_ttl_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache_ttl_ms",
                "0",
                "cache ttl must be greater than 0",
            ));
        }

        if self.sweep_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "sweep_interval_ms",
                "0",
                "sweep interval must be greater than 0",
            ));
        }

        Ok(())
    }
}
