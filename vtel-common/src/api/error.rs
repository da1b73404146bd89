//! API call error type
//!
//! Errors are surfaced to callers unchanged: a non-2xx response keeps its
//! status code and the server-provided body. The type is `Clone` because a
//! single debounced invocation delivers its outcome to every coalesced caller.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No response received (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("API error {status}: {body}")]
    Status { status: u16, body: Value },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request could not be built (bad header, bad URL)
    #[error("Request error: {0}")]
    Request(String),

    /// Debounced request ended without a result
    ///
    /// Callers hold the dispatcher (and so its debouncer) while waiting, so in
    /// practice this means the transport panicked inside the timer task.
    #[error("Request cancelled before completion")]
    Cancelled,
}

impl ApiError {
    /// HTTP status code, when the server responded
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided error body, when the server responded
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Best-effort human readable message from the server body
    ///
    /// Looks for `message` then `error` string fields, falling back to the
    /// error's display text.
    pub fn message(&self) -> String {
        self.body()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}
