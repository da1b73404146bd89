//! Shared API request/response types
//!
//! # Response shapes
//!
//! The backend does not use one response shape across endpoints. Observed
//! bodies are:
//! - `{"success": true, "data": ...}`
//! - a bare array or object
//! - `{"data": {"data": ...}}` (one extra level of nesting)
//!
//! The dispatcher returns bodies verbatim. [`ApiEnvelope`] and
//! [`normalize_payload`] are opt-in helpers for callers that want a single
//! canonical shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ========================================
// Request Method
// ========================================

/// HTTP method accepted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request payload is sent as the body for this method
    ///
    /// Only POST, PUT and PATCH carry a body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(Error::InvalidInput(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

// ========================================
// Response Envelope
// ========================================

/// Canonical `{success, data, message}` response envelope
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vtel_common::api::ApiEnvelope;
///
/// let envelope = ApiEnvelope::from_value(json!({"success": true, "data": [1, 2]}));
/// assert!(envelope.success);
/// assert_eq!(envelope.data, Some(json!([1, 2])));
///
/// // Bare bodies are treated as successful payloads
/// let envelope = ApiEnvelope::from_value(json!([3]));
/// assert_eq!(envelope.data, Some(json!([3])));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Human-readable message (usually present on failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl ApiEnvelope {
    /// Interpret any response body as an envelope
    ///
    /// Objects carrying a boolean `success` field are read as envelopes and
    /// their `data` is normalized. Anything else is a successful bare payload.
    pub fn from_value(body: Value) -> Self {
        let is_envelope = body
            .as_object()
            .and_then(|obj| obj.get("success"))
            .is_some_and(Value::is_boolean);

        if is_envelope {
            let success = body["success"].as_bool().unwrap_or(true);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            let data = body.get("data").cloned().map(normalize_payload);
            return Self { success, data, message };
        }

        Self {
            success: true,
            data: Some(normalize_payload(body)),
            message: None,
        }
    }
}

/// Maximum envelope levels unwrapped by [`normalize_payload`]
const MAX_UNWRAP_DEPTH: usize = 2;

/// Extract the payload from any of the known response shapes
///
/// An object is treated as a wrapper when it has a `data` key and either a
/// `success` key or no other keys. At most two wrapper levels are removed.
/// Bare arrays, scalars and objects that are not wrappers are returned as is.
///
/// ```
/// use serde_json::json;
/// use vtel_common::api::normalize_payload;
///
/// assert_eq!(normalize_payload(json!({"success": true, "data": [1]})), json!([1]));
/// assert_eq!(normalize_payload(json!({"data": {"data": {"id": 1}}})), json!({"id": 1}));
/// assert_eq!(normalize_payload(json!({"id": 1, "data": "x"})), json!({"id": 1, "data": "x"}));
/// ```
pub fn normalize_payload(body: Value) -> Value {
    let mut current = body;
    for _ in 0..MAX_UNWRAP_DEPTH {
        match unwrap_once(current) {
            Ok(inner) => current = inner,
            Err(unchanged) => return unchanged,
        }
    }
    current
}

fn unwrap_once(body: Value) -> Result<Value, Value> {
    match body {
        Value::Object(mut obj) => {
            let is_wrapper =
                obj.contains_key("data") && (obj.contains_key("success") || obj.len() == 1);
            if is_wrapper {
                Ok(obj.remove("data").unwrap_or(Value::Null))
            } else {
                Err(Value::Object(obj))
            }
        }
        other => Err(other),
    }
}

// ========================================
// Tests
// ========================================
