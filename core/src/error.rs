//! Error types for generated API calls.
//!
//! # Design
//! `ApiError` is the only error a caller ever sees. It is plain data so it
//! can be stored in slice state and compared in tests. `TransportError`
//! describes what went wrong below HTTP semantics and is folded into
//! `ApiError` at a single point (`From<TransportError>`), next to
//! `ApiError::from_response` for non-2xx responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::HttpResponse;

/// Normalized failure of an API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            data: None,
        }
    }

    /// Build the error for a response whose status is not 2xx. The body is
    /// kept as JSON when it parses, otherwise as a JSON string.
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            message: format!("Request failed with status code {}", response.status),
            status: Some(response.status),
            data: body_value(&response.body),
        }
    }

    pub(crate) fn unknown_endpoint(key: &str) -> Self {
        Self::new(format!("unknown endpoint: {key}"))
    }

    pub(crate) fn serialization(err: serde_json::Error) -> Self {
        Self::new(format!("failed to serialize request params: {err}"))
    }

    pub(crate) fn deserialization(err: serde_json::Error, response: &HttpResponse) -> Self {
        Self {
            message: format!("failed to decode response body: {err}"),
            status: Some(response.status),
            data: Some(Value::String(response.body.clone())),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Failures raised by a `Transport` before an HTTP status is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::new(err.to_string())
    }
}

fn body_value(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
