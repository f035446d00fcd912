//! Typed REST clients, lifecycle state slices and cached query hooks
//! generated from a declarative endpoint map.
//!
//! # Overview
//! - [`ApiClient`] turns `{ base_url, endpoints }` into one async call per
//!   endpoint key. [`define_client!`] does the same at compile time.
//! - [`ApiSlice`] and [`Store`] track `loading` / `error` / `data` around
//!   caller-supplied fetch and update operations.
//! - [`ApiHooks`] turns the same endpoint map into named query and mutation
//!   hooks backed by a per-input query cache.
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); only a [`Transport`] touches the network.
//! - Every failure is normalized into one [`ApiError`] shape.
//! - Reducers are pure functions; actions are enums tagged with the slice
//!   name.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod hooks;
pub mod http;
pub mod slice;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, EndpointCall};
pub use config::{ClientConfig, RequestConfig};
pub use endpoint::{EndpointDescriptor, EndpointMap};
pub use error::{ApiError, TransportError};
pub use hooks::{ApiHooks, ApiState, HookDefinition, HookKind, QueryState, QueryStatus, RequestArgs};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use slice::{ActionKind, ApiSlice, AsyncPhase, GenericState, SliceAction};
pub use store::Store;
pub use transport::{ReqwestTransport, Transport};
pub use types::ApiResponse;

#[doc(hidden)]
pub mod __private {
    pub use serde;
}
