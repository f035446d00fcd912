//! Client configuration and per-call overrides.

use std::time::Duration;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{upsert_header, HttpRequest};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "APIKIT_BASE_URL";

/// Environment variable holding the request timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "APIKIT_TIMEOUT_SECS";

/// Settings shared by every call made through one client or hook bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Sent on every request after `content-type: application/json`.
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_headers: Vec::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Read `APIKIT_BASE_URL` and optionally `APIKIT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup(BASE_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::new(format!("{BASE_URL_ENV} is not set")))?;

        let mut config = Self::new(&base_url);
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ApiError::new(format!("{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Per-call override merged on top of the generated request. Headers are
/// merged by name; any other field that is set replaces the generated one
/// outright, so a non-empty `query` drops every generated query pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge this override into `request`.
    pub fn apply(self, request: &mut HttpRequest) -> Result<(), ApiError> {
        for (name, value) in &self.headers {
            upsert_header(&mut request.headers, name, value);
        }
        if !self.query.is_empty() {
            request.query = self.query;
        }
        if let Some(body) = self.body {
            request.body = Some(serde_json::to_string(&body).map_err(ApiError::serialization)?);
        }
        if self.timeout.is_some() {
            request.timeout = self.timeout;
        }
        Ok(())
    }
}
