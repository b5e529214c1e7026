//! # Fetch Error Types
//!
//! Unified error taxonomy for the dispatcher and transport layer. Every
//! variant is assigned a closed [`ErrorKind`] at construction time so the
//! request tracker can histogram failures without inspecting type names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Result type for transport and dispatch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Field-level error details carried back to callers (`field -> messages`)
pub type ErrorDetails = HashMap<String, Vec<String>>;

/// Errors raised while performing a logical fetch
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        details: Option<ErrorDetails>,
    },

    /// The attempt exceeded its timeout and was aborted
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Cancelled { url: String, timeout_ms: u64 },

    /// Refused locally by the rate limiter, never sent over the wire
    #[error("Rate limit exceeded. Retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Connection, DNS or other network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not a valid JSON envelope
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Request could not be built (bad URL, unsupported header, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Closed classification of fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Non-2xx HTTP status
    TransportStatus,
    /// Timeout-triggered abort
    Cancellation,
    /// Local admission refusal
    RateLimitExceeded,
    /// Everything else the transport can throw
    GenericTransport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportStatus => "transport_status",
            ErrorKind::Cancellation => "cancellation",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::GenericTransport => "generic_transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    /// Create a status error in the `HTTP error {status}: {text}` form
    pub fn status(status: u16, status_text: impl AsRef<str>) -> Self {
        Self::Status {
            status,
            message: format!("HTTP error {}: {}", status, status_text.as_ref()),
            details: None,
        }
    }

    /// Attach field-level details to a status error; other variants are returned unchanged
    #[must_use]
    pub fn with_details(self, details: Option<ErrorDetails>) -> Self {
        match self {
            Self::Status {
                status, message, ..
            } => Self::Status {
                status,
                message,
                details,
            },
            other => other,
        }
    }

    /// Create a timeout/cancellation error
    pub fn cancelled(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Cancelled {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Create a local rate-limit refusal
    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self::RateLimited { retry_after_ms }
    }

    /// Create a generic network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Status { .. } => ErrorKind::TransportStatus,
            FetchError::Cancelled { .. } => ErrorKind::Cancellation,
            FetchError::RateLimited { .. } => ErrorKind::RateLimitExceeded,
            FetchError::Network(_) | FetchError::Decode(_) | FetchError::InvalidRequest(_) => {
                ErrorKind::GenericTransport
            }
        }
    }

    /// Status code reported in the error envelope
    pub fn status_code(&self) -> u16 {
        match self {
            FetchError::Status { status, .. } => *status,
            FetchError::RateLimited { .. } => 429,
            FetchError::Cancelled { .. } => 408,
            _ => 500,
        }
    }

    /// HTTP status carried by a transport status error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured details, only ever present on status errors
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            FetchError::Status { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }

    /// Default retry eligibility, ignoring any caller-supplied condition
    ///
    /// Cancellations and local refusals are terminal. Status errors retry on
    /// 408, 429 and 5xx only. Anything else is assumed transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Cancelled { .. } => false,
            FetchError::RateLimited { .. } => false,
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            FetchError::Network(_) | FetchError::Decode(_) | FetchError::InvalidRequest(_) => true,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            FetchError::InvalidRequest(error.to_string())
        } else if error.is_decode() || error.is_body() {
            FetchError::Decode(error.to_string())
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_format() {
        let error = FetchError::status(503, "Service Unavailable");
        assert_eq!(error.to_string(), "HTTP error 503: Service Unavailable");
        assert_eq!(error.kind(), ErrorKind::TransportStatus);
        assert_eq!(error.status_code(), 503);
    }

    #[test]
    fn test_retry_classification() {
        assert!(FetchError::status(500, "Internal Server Error").is_retryable());
        assert!(FetchError::status(503, "Service Unavailable").is_retryable());
        assert!(FetchError::status(429, "Too Many Requests").is_retryable());
        assert!(FetchError::status(408, "Request Timeout").is_retryable());
        assert!(!FetchError::status(404, "Not Found").is_retryable());
        assert!(!FetchError::status(400, "Bad Request").is_retryable());
        assert!(!FetchError::cancelled("/api/tags", 5000).is_retryable());
        assert!(!FetchError::rate_limited(1000).is_retryable());
        assert!(FetchError::network("connection refused").is_retryable());
        assert!(FetchError::Decode("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FetchError::cancelled("/api", 10).kind(),
            ErrorKind::Cancellation
        );
        assert_eq!(
            FetchError::rate_limited(10).kind(),
            ErrorKind::RateLimitExceeded
        );
        assert_eq!(
            FetchError::Decode("bad".into()).kind(),
            ErrorKind::GenericTransport
        );
        assert_eq!(
            FetchError::InvalidRequest("bad".into()).kind(),
            ErrorKind::GenericTransport
        );
    }

    #[test]
    fn test_envelope_status_codes() {
        assert_eq!(FetchError::rate_limited(10).status_code(), 429);
        assert_eq!(FetchError::cancelled("/api", 10).status_code(), 408);
        assert_eq!(FetchError::network("down").status_code(), 500);
    }

    #[test]
    fn test_with_details_only_touches_status_errors() {
        let mut details = ErrorDetails::new();
        details.insert("email".to_string(), vec!["required".to_string()]);

        let status = FetchError::status(400, "Bad Request").with_details(Some(details));
        assert!(status.details().is_some());

        let network = FetchError::network("down").with_details(None);
        assert!(network.details().is_none());
        assert_eq!(network.kind(), ErrorKind::GenericTransport);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::RateLimitExceeded).unwrap();
        assert_eq!(json, "\"rate_limit_exceeded\"");
        assert_eq!(ErrorKind::Cancellation.to_string(), "cancellation");
    }
}
