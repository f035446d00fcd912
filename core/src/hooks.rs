//! Query and mutation hooks generated from an endpoint map.
//!
//! # Overview
//! Every `GET` endpoint becomes a query hook named `get<Key>`, every other
//! endpoint a mutation hook named `<method><Key>` (`postCreateUser`,
//! `deleteUser`, ...). Names are computed once, at registration.
//!
//! # Design
//! - A hook definition only knows how to resolve its input into
//!   [`RequestArgs`]; execution goes through the same connection, default
//!   headers and error normalization as [`crate::ApiClient`].
//! - Query results are cached per `(hook, input)` until
//!   [`ApiHooks::reset_api_state`]. Mutations are never served from cache;
//!   only their last result is recorded.
//! - The cache lock is never held across a network call. Overlapping calls
//!   for the same entry settle last-write-wins.
//! - One tag category, `ApiData`, is declared. No hook provides or
//!   invalidates it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::client::Connection;
use crate::config::ClientConfig;
use crate::endpoint::{query_pairs, resolve_path, EndpointDescriptor, EndpointMap};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::decode_body;

/// Key under which the hook state is mounted.
pub const REDUCER_PATH: &str = "api";

/// Tag categories declared for invalidation grouping.
pub const TAG_TYPES: &[&str] = &["ApiData"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookKind {
    Query,
    Mutation,
}

/// Generated hook name for an endpoint key.
pub fn hook_name(key: &str, method: HttpMethod) -> String {
    let prefix = method.as_str().to_ascii_lowercase();
    let mut chars = key.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{prefix}{capitalized}")
}

/// What a hook asks the connection to send.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestArgs {
    pub method: HttpMethod,
    /// Path relative to the base URL.
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    pub name: String,
    pub key: String,
    pub kind: HookKind,
    pub endpoint: EndpointDescriptor,
}

impl HookDefinition {
    pub fn new(key: &str, endpoint: EndpointDescriptor) -> Self {
        let kind = match endpoint.method {
            HttpMethod::Get => HookKind::Query,
            _ => HookKind::Mutation,
        };
        Self {
            name: hook_name(key, endpoint.method),
            key: key.to_string(),
            kind,
            endpoint,
        }
    }

    /// Resolve `input` into request arguments.
    ///
    /// Queries send the input fields not consumed by path placeholders as
    /// query parameters. Mutations send the whole input as the body.
    pub fn resolve(&self, input: &Value) -> RequestArgs {
        let resolved = resolve_path(&self.endpoint.path, input);
        match self.kind {
            HookKind::Query => RequestArgs {
                method: self.endpoint.method,
                url: resolved.path,
                params: query_pairs(input, &resolved.placeholders),
                body: None,
            },
            HookKind::Mutation => RequestArgs {
                method: self.endpoint.method,
                url: resolved.path,
                params: Vec::new(),
                body: (!input.is_null()).then(|| input.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

/// Cached state of one query entry or one mutation hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<ApiError>,
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Fulfilled
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Rejected
    }

    fn pending(previous: Option<&QueryState>) -> Self {
        Self {
            status: QueryStatus::Pending,
            data: previous.and_then(|p| p.data.clone()),
            error: None,
        }
    }

    fn settled(previous: Option<&QueryState>, result: &Result<Value, ApiError>) -> Self {
        match result {
            Ok(data) => Self {
                status: QueryStatus::Fulfilled,
                data: Some(data.clone()),
                error: None,
            },
            Err(error) => Self {
                status: QueryStatus::Rejected,
                data: previous.and_then(|p| p.data.clone()),
                error: Some(error.clone()),
            },
        }
    }
}

/// Everything the hooks have cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiState {
    /// Keyed by `name(input-json)`, e.g. `getUser({"id":1})`.
    pub queries: BTreeMap<String, QueryState>,
    /// Keyed by hook name.
    pub mutations: BTreeMap<String, QueryState>,
}

fn cache_key(name: &str, input: &Value) -> String {
    format!("{name}({input})")
}

/// Hook bundle generated from an endpoint map.
#[derive(Debug)]
pub struct ApiHooks<Tr = ReqwestTransport> {
    connection: Connection<Tr>,
    hooks: BTreeMap<String, HookDefinition>,
    state: RwLock<ApiState>,
}

impl ApiHooks<ReqwestTransport> {
    pub fn new(config: ClientConfig, endpoints: &EndpointMap) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_shared_transport(&config, endpoints, Arc::new(transport)))
    }
}

impl<Tr: Transport> ApiHooks<Tr> {
    pub fn with_transport(base_url: &str, endpoints: &EndpointMap, transport: Tr) -> Self {
        Self::with_shared_transport(&ClientConfig::new(base_url), endpoints, Arc::new(transport))
    }

    pub fn with_shared_transport(config: &ClientConfig, endpoints: &EndpointMap, transport: Arc<Tr>) -> Self {
        let mut hooks: BTreeMap<String, HookDefinition> = BTreeMap::new();
        for (key, endpoint) in endpoints {
            let hook = HookDefinition::new(key, endpoint.clone());
            if let Some(existing) = hooks.get(&hook.name) {
                tracing::warn!(
                    hook = %hook.name,
                    kept = %existing.key,
                    dropped = %key,
                    "two endpoints generate the same hook name"
                );
                continue;
            }
            hooks.insert(hook.name.clone(), hook);
        }

        Self {
            connection: Connection::new(&config.base_url, config.default_headers.clone(), transport),
            hooks,
            state: RwLock::new(ApiState::default()),
        }
    }

    pub fn reducer_path(&self) -> &'static str {
        REDUCER_PATH
    }

    pub fn tag_types(&self) -> &'static [&'static str] {
        TAG_TYPES
    }

    pub fn hook(&self, name: &str) -> Option<&HookDefinition> {
        self.hooks.get(name)
    }

    pub fn hook_names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    /// Run a query hook, serving a fulfilled cached result when one exists
    /// for the same input.
    pub async fn query<P, R>(&self, name: &str, input: &P) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let hook = self.hook_of_kind(name, HookKind::Query)?;
        let input = serde_json::to_value(input).map_err(ApiError::serialization)?;
        let key = cache_key(name, &input);

        let cached = {
            let state = self.state.read().await;
            state
                .queries
                .get(&key)
                .filter(|entry| entry.is_success())
                .and_then(|entry| entry.data.clone())
        };
        if let Some(data) = cached {
            tracing::debug!(cache_key = %key, "query served from cache");
            return decode_value(data);
        }

        self.run_query(hook, key, &input).await
    }

    /// Run a query hook, ignoring any cached result.
    pub async fn refetch<P, R>(&self, name: &str, input: &P) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let hook = self.hook_of_kind(name, HookKind::Query)?;
        let input = serde_json::to_value(input).map_err(ApiError::serialization)?;
        let key = cache_key(name, &input);
        self.run_query(hook, key, &input).await
    }

    /// Run a mutation hook. The result is recorded but never reused.
    pub async fn mutate<P, R>(&self, name: &str, input: &P) -> Result<R, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let hook = self.hook_of_kind(name, HookKind::Mutation)?;
        let input = serde_json::to_value(input).map_err(ApiError::serialization)?;

        {
            let mut state = self.state.write().await;
            let next = QueryState::pending(state.mutations.get(name));
            state.mutations.insert(name.to_string(), next);
        }

        let result = self.execute(hook, &input).await;

        {
            let mut state = self.state.write().await;
            let next = QueryState::settled(state.mutations.get(name), &result);
            state.mutations.insert(name.to_string(), next);
        }

        decode_value(result?)
    }

    /// Cached state for `(name, input)`; `Uninitialized` when absent.
    pub async fn query_state<P>(&self, name: &str, input: &P) -> Result<QueryState, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let input = serde_json::to_value(input).map_err(ApiError::serialization)?;
        let state = self.state.read().await;
        Ok(state.queries.get(&cache_key(name, &input)).cloned().unwrap_or_default())
    }

    pub async fn mutation_state(&self, name: &str) -> QueryState {
        self.state.read().await.mutations.get(name).cloned().unwrap_or_default()
    }

    /// Snapshot of every cached query and mutation result.
    pub async fn state(&self) -> ApiState {
        self.state.read().await.clone()
    }

    /// Drop every cached query and recorded mutation.
    pub async fn reset_api_state(&self) {
        *self.state.write().await = ApiState::default();
        tracing::debug!("api state reset");
    }

    fn hook_of_kind(&self, name: &str, kind: HookKind) -> Result<&HookDefinition, ApiError> {
        let hook = self
            .hooks
            .get(name)
            .ok_or_else(|| ApiError::new(format!("unknown hook: {name}")))?;
        if hook.kind != kind {
            return Err(ApiError::new(format!("{name} is a {:?} hook, not a {kind:?} hook", hook.kind)));
        }
        Ok(hook)
    }

    async fn run_query<R: DeserializeOwned>(&self, hook: &HookDefinition, key: String, input: &Value) -> Result<R, ApiError> {
        {
            let mut state = self.state.write().await;
            let next = QueryState::pending(state.queries.get(&key));
            state.queries.insert(key.clone(), next);
        }

        let result = self.execute(hook, input).await;

        {
            let mut state = self.state.write().await;
            let next = QueryState::settled(state.queries.get(&key), &result);
            state.queries.insert(key, next);
        }

        decode_value(result?)
    }

    async fn execute(&self, hook: &HookDefinition, input: &Value) -> Result<Value, ApiError> {
        let args = hook.resolve(input);
        let body = args.body.map(|body| body.to_string());
        let request = self.connection.request(args.method, &args.url, args.params, body);
        tracing::debug!(hook = %hook.name, "running hook");
        let response = self.connection.send(request).await?;
        decode_body(&response)
    }
}

fn decode_value<R: DeserializeOwned>(data: Value) -> Result<R, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::new(format!("failed to decode hook data: {e}")))
}
