//! Result shapes shared by the client and the hooks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Successful result of a direct client call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<R> {
    pub data: R,
    pub status: u16,
    pub status_text: String,
}

impl<R> ApiResponse<R> {
    pub fn map<U>(self, f: impl FnOnce(R) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: f(self.data),
            status: self.status,
            status_text: self.status_text,
        }
    }
}

/// Decode a 2xx response body. An empty body decodes as JSON `null`, so
/// `()`, `Option<_>` and `Value` all accept a 204.
pub(crate) fn decode_body<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    let decoded = if response.body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(&response.body)
    };
    decoded.map_err(|e| ApiError::deserialization(e, response))
}

pub(crate) fn decode_response<R: DeserializeOwned>(response: HttpResponse) -> Result<ApiResponse<R>, ApiError> {
    let data = decode_body(&response)?;
    Ok(ApiResponse {
        data,
        status: response.status,
        status_text: response.status_text,
    })
}
