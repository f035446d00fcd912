//! Declarative endpoint maps and path templates.
//!
//! An endpoint path may contain `:name` placeholders. A placeholder name runs
//! up to the next `/` (or the end of the template). Placeholders are filled
//! from the top-level fields of the call's params; a missing field becomes an
//! empty segment rather than an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::HttpMethod;

/// Method and path template for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Names of the placeholders in `path`, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(pos) = rest.find(':') {
            let after = &rest[pos + 1..];
            let end = after.find('/').unwrap_or(after.len());
            if end > 0 {
                names.push(&after[..end]);
            }
            rest = &after[end..];
        }
        names
    }
}

/// Endpoint key to descriptor. Keys become call and hook names.
pub type EndpointMap = BTreeMap<String, EndpointDescriptor>;

/// A path template with its placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    /// Placeholder names found in the template, whether or not a value was
    /// supplied for them.
    pub placeholders: Vec<String>,
}

/// Substitute every `:name` placeholder in `template` from `params`.
pub fn resolve_path(template: &str, params: &Value) -> ResolvedPath {
    let mut path = String::with_capacity(template.len());
    let mut placeholders = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(':') {
        path.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let end = after.find('/').unwrap_or(after.len());
        if end == 0 {
            path.push(':');
            rest = after;
            continue;
        }

        let name = &after[..end];
        match params.get(name) {
            Some(value) => path.push_str(&param_to_string(value)),
            None => tracing::debug!(placeholder = name, template, "path param missing, substituting empty segment"),
        }
        placeholders.push(name.to_string());
        rest = &after[end..];
    }
    path.push_str(rest);

    ResolvedPath { path, placeholders }
}

/// String form of a param value as it appears in a path or query string.
pub fn param_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten the top-level fields of `params` into query pairs, skipping the
/// names in `skip`. `null` fields are dropped and arrays repeat their key.
pub fn query_pairs(params: &Value, skip: &[String]) -> Vec<(String, String)> {
    let Some(fields) = params.as_object() else {
        if !params.is_null() {
            tracing::debug!("non-object params cannot be sent as a query string, ignoring");
        }
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in fields {
        if skip.iter().any(|s| s == key) {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Array(items) => {
                pairs.extend(
                    items
                        .iter()
                        .filter(|item| !item.is_null())
                        .map(|item| (key.clone(), param_to_string(item))),
                );
            }
            other => pairs.push((key.clone(), param_to_string(other))),
        }
    }
    pairs
}

/// Build an [`EndpointMap`] from a literal table.
///
/// ```rust
/// use apikit_core::{endpoints, HttpMethod};
///
/// let map = endpoints! {
///     users => GET "/users",
///     getUser => GET "/users/:id",
///     "create-user" => POST "/users",
/// };
/// assert_eq!(map["getUser"].method, HttpMethod::Get);
/// assert_eq!(map["create-user"].path, "/users");
/// ```
#[macro_export]
macro_rules! endpoints {
    ($($key:tt => $method:ident $path:literal),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::EndpointMap::new();
        $(
            map.insert(
                ::std::string::String::from($crate::__endpoint_key!($key)),
                $crate::EndpointDescriptor::new($crate::__http_method!($method), $path),
            );
        )*
        map
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __endpoint_key {
    ($key:ident) => {
        stringify!($key)
    };
    ($key:literal) => {
        $key
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __http_method {
    (GET) => {
        $crate::HttpMethod::Get
    };
    (POST) => {
        $crate::HttpMethod::Post
    };
    (PUT) => {
        $crate::HttpMethod::Put
    };
    (DELETE) => {
        $crate::HttpMethod::Delete
    };
}
