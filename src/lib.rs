#![allow(clippy::doc_markdown)] // Allow technical terms like DevFlow, RFC 3339 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # DevFlow Fetch
//!
//! Resilient HTTP client layer for the DevFlow Q&A backend.
//!
//! ## Overview
//!
//! Every outbound request goes through a single dispatcher that combines a
//! TTL response cache, sliding-window rate limiting, timeout-bounded retries
//! with exponential backoff and jitter, and request statistics. Callers
//! always receive a uniform [`ActionResponse`] envelope; no failure escapes
//! as a panic or a `Result::Err`.
//!
//! ## Module Organization
//!
//! - [`error`] - `FetchError` and the closed `ErrorKind` taxonomy
//! - [`envelope`] - `ActionResponse` and error-to-envelope conversion
//! - [`config`] - Configuration defaults and layered loading
//! - [`logging`] - Structured logging setup
//! - [`cache`] - Request fingerprints and the TTL response cache
//! - [`rate_limit`] - Per-key sliding-window limiter
//! - [`tracker`] - Request outcome counters
//! - [`transport`] - HTTP transport seam and the reqwest implementation
//! - [`dispatcher`] - The fetch pipeline
//! - [`maintenance`] - Periodic cache and limiter sweeps
//! - [`stats`] - Combined statistics and monitoring snapshots
//! - [`client`] - `FetchClient` composition root
//! - [`api`] - Typed endpoint groups
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use devflow_fetch::api::DevflowApi;
//! use devflow_fetch::logging::init_structured_logging;
//! use devflow_fetch::{FetchClient, FetchConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_structured_logging();
//!
//! let client = FetchClient::with_reqwest(FetchConfig::load()?)?;
//! let api = DevflowApi::new(client);
//!
//! let users = api.users().get_all().await;
//! match users.data {
//!     Some(users) => println!("{} users", users.len()),
//!     None => println!("failed: {:?}", users.error_message()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod maintenance;
pub mod rate_limit;
pub mod stats;
pub mod tracker;
pub mod transport;

pub use cache::{CacheStats, ResponseCache};
pub use client::FetchClient;
pub use config::{AppEnvironment, ConfigurationError, FetchConfig};
pub use dispatcher::{CacheOptions, Dispatcher, FetchOptions, RateLimitOptions, RetryCondition};
pub use envelope::{handle_error, ActionResponse, ActionResponseError};
pub use error::{ErrorDetails, ErrorKind, FetchError, FetchResult};
pub use maintenance::{MaintenanceHandle, SweepReport};
pub use rate_limit::{RateLimitStats, SlidingWindowLimiter};
pub use stats::{ComprehensiveStats, EnvironmentStats, MonitoringSnapshot};
pub use tracker::{RequestStats, RequestTracker};
pub use transport::{HttpMethod, HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
