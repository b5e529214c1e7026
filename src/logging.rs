//! # Structured Logging Module
//!
//! Environment-aware structured logging for the fetch layer. Development and
//! test runs get human-readable debug output; production gets JSON lines at
//! info level. `RUST_LOG` always wins when set.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::AppEnvironment;
use crate::error::FetchError;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging for the detected environment
pub fn init_structured_logging() {
    init_structured_logging_for(AppEnvironment::detect());
}

/// Initialize structured logging for an explicit environment
///
/// Safe to call repeatedly; only the first call installs a subscriber, and an
/// already-installed global subscriber is left in place.
pub fn init_structured_logging_for(environment: AppEnvironment) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = std::env::var("RUST_LOG")
            .ok()
            .map(EnvFilter::new)
            .unwrap_or_else(|| EnvFilter::new(get_log_level(environment)));

        let layer = match environment {
            AppEnvironment::Production => fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
            _ => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed(),
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            pid = std::process::id(),
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log level based on environment
fn get_log_level(environment: AppEnvironment) -> &'static str {
    match environment {
        AppEnvironment::Development => "debug",
        AppEnvironment::Test => "debug",
        AppEnvironment::Production => "info",
    }
}

/// Log a terminal fetch failure with full context
pub fn log_fetch_failure(
    request_id: Uuid,
    method: &str,
    url: &str,
    error: &FetchError,
    total_duration_ms: u64,
    was_retried: bool,
) {
    tracing::error!(
        request_id = %request_id,
        method = %method,
        url = %url,
        error = %error,
        error_kind = %error.kind(),
        status = error.status_code(),
        total_duration_ms = total_duration_ms,
        was_retried = was_retried,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ FETCH_FAILED"
    );
}
