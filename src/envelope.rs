//! # Response Envelope
//!
//! The uniform `{success, data?, status?, error?}` wrapper every API route
//! produces and every fetch resolves to. Failures never escape a fetch as a
//! `Result::Err`; they are converted here instead.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorDetails, FetchError};

/// Uniform result wrapper returned by every fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionResponseError>,
}

/// Error payload of a failed envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl<T> ActionResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            status: None,
            error: None,
        }
    }

    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            status: Some(status),
            error: Some(ActionResponseError {
                message: message.into(),
                details: None,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Message of the error payload, if this is a failure
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    pub fn map<U, F>(self, f: F) -> ActionResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ActionResponse {
            success: self.success,
            data: self.data.map(f),
            status: self.status,
            error: self.error,
        }
    }
}

/// Convert any fetch failure into the uniform error envelope
pub fn handle_error<T>(error: &FetchError) -> ActionResponse<T> {
    ActionResponse {
        success: false,
        data: None,
        status: Some(error.status_code()),
        error: Some(ActionResponseError {
            message: error.to_string(),
            details: error.details().cloned(),
        }),
    }
}

impl<T> From<FetchError> for ActionResponse<T> {
    fn from(error: FetchError) -> Self {
        handle_error(&error)
    }
}

/// Pull `error.details` out of a server-side error envelope body, if it is one
pub(crate) fn extract_error_details(body: &str) -> Option<ErrorDetails> {
    serde_json::from_str::<ActionResponse<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.success)
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.details)
}
