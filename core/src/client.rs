//! Endpoint-map client: one callable per endpoint key.
//!
//! # Design
//! Each call is split the same way as a hand-written client would be:
//! `build_request` turns `(key, params, override)` into an `HttpRequest`,
//! the shared `Transport` executes it, and `parse_response` turns the
//! `HttpResponse` into an `ApiResponse`. Both halves are public, so the
//! client also works when the host performs the I/O itself.
//!
//! Every failure (unknown key, bad params, transport error, non-2xx status,
//! undecodable body) comes back as an `ApiError`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{instrument, Span};

use crate::config::{normalize_base_url, ClientConfig, RequestConfig};
use crate::endpoint::{query_pairs, resolve_path, EndpointDescriptor, EndpointMap};
use crate::error::ApiError;
use crate::http::{upsert_header, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{decode_response, ApiResponse};

/// Base URL, default headers and the shared transport. Used by both
/// `ApiClient` and `ApiHooks` so every generated call is built and
/// normalized the same way.
#[derive(Debug)]
pub(crate) struct Connection<Tr> {
    base_url: String,
    default_headers: Vec<(String, String)>,
    transport: Arc<Tr>,
}

impl<Tr> Clone for Connection<Tr> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            default_headers: self.default_headers.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<Tr: Transport> Connection<Tr> {
    pub(crate) fn new(base_url: &str, default_headers: Vec<(String, String)>, transport: Arc<Tr>) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            default_headers,
            transport,
        }
    }

    pub(crate) fn transport(&self) -> &Arc<Tr> {
        &self.transport
    }

    pub(crate) fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        for (name, value) in &self.default_headers {
            upsert_header(&mut headers, name, value);
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            query,
            headers,
            body,
            timeout: None,
        }
    }

    /// Execute `request` and normalize any failure into an `ApiError`.
    #[instrument(
        name = "api_request",
        skip(self, request),
        fields(
            http.method = %request.method,
            http.url = %request.url,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(request).await.map_err(|err| {
            tracing::warn!(error = %err, "request failed before a response was received");
            ApiError::from(err)
        })?;

        Span::current().record("http.status_code", response.status);
        if !response.is_success() {
            tracing::warn!(status = response.status, "request failed");
            return Err(ApiError::from_response(&response));
        }
        Ok(response)
    }
}

/// Async client with one call per endpoint key.
///
/// ```rust,ignore
/// use apikit_core::{endpoints, ApiClient, ClientConfig, RequestConfig};
///
/// let client = ApiClient::new(
///     ClientConfig::new("https://api.example.com"),
///     endpoints! {
///         getUser => GET "/users/:id",
///         createUser => POST "/users",
///     },
/// )?;
///
/// let user: ApiResponse<User> = client.call("getUser", &json!({"id": 42}), None).await?;
/// ```
#[derive(Debug)]
pub struct ApiClient<Tr = ReqwestTransport> {
    connection: Connection<Tr>,
    endpoints: EndpointMap,
}

impl<Tr> Clone for ApiClient<Tr> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            endpoints: self.endpoints.clone(),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    /// Build a client over a new `reqwest` transport configured from `config`.
    pub fn new(config: ClientConfig, endpoints: EndpointMap) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_shared_transport(&config, endpoints, Arc::new(transport)))
    }
}

impl<Tr: Transport> ApiClient<Tr> {
    pub fn with_transport(base_url: &str, endpoints: EndpointMap, transport: Tr) -> Self {
        Self::with_shared_transport(&ClientConfig::new(base_url), endpoints, Arc::new(transport))
    }

    /// Build a client that reuses an existing transport instance.
    pub fn with_shared_transport(config: &ClientConfig, endpoints: EndpointMap, transport: Arc<Tr>) -> Self {
        Self {
            connection: Connection::new(&config.base_url, config.default_headers.clone(), transport),
            endpoints,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.connection.base_url
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    pub fn transport(&self) -> &Arc<Tr> {
        self.connection.transport()
    }

    /// Handle for a single endpoint, or `None` if `key` is not in the map.
    pub fn endpoint<'a>(&'a self, key: &'a str) -> Option<EndpointCall<'a, Tr>> {
        let descriptor = self.endpoints.get(key)?;
        Some(EndpointCall {
            client: self,
            key,
            descriptor,
        })
    }

    /// Build the request for `key` without sending it.
    ///
    /// `GET`/`DELETE` send the top-level fields of `params` as query
    /// parameters; `POST`/`PUT` send `params` as the JSON body. Pass `&()`
    /// for no params.
    pub fn build_request<P>(&self, key: &str, params: &P, config: Option<RequestConfig>) -> Result<HttpRequest, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let endpoint = self.endpoints.get(key).ok_or_else(|| ApiError::unknown_endpoint(key))?;
        let params = serde_json::to_value(params).map_err(ApiError::serialization)?;
        let resolved = resolve_path(&endpoint.path, &params);

        let (query, body) = if endpoint.method.sends_body() {
            (Vec::new(), (!params.is_null()).then(|| params.to_string()))
        } else {
            (query_pairs(&params, &[]), None)
        };

        let mut request = self.connection.request(endpoint.method, &resolved.path, query, body);
        if let Some(config) = config {
            config.apply(&mut request)?;
        }
        Ok(request)
    }

    /// Turn a raw response into an `ApiResponse`, or the normalized error.
    pub fn parse_response<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<ApiResponse<R>, ApiError> {
        if !response.is_success() {
            return Err(ApiError::from_response(&response));
        }
        decode_response(response)
    }

    /// Call the endpoint named `key`.
    pub async fn call<P, R>(&self, key: &str, params: &P, config: Option<RequestConfig>) -> Result<ApiResponse<R>, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.build_request(key, params, config)?;
        tracing::debug!(endpoint = key, method = %request.method, "calling endpoint");
        let response = self.connection.send(request).await?;
        decode_response(response)
    }
}

/// One endpoint of an [`ApiClient`], callable on its own.
#[derive(Debug)]
pub struct EndpointCall<'a, Tr> {
    client: &'a ApiClient<Tr>,
    key: &'a str,
    descriptor: &'a EndpointDescriptor,
}

impl<'a, Tr: Transport> EndpointCall<'a, Tr> {
    pub fn key(&self) -> &str {
        self.key
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        self.descriptor
    }

    pub async fn call<P, R>(&self, params: &P, config: Option<RequestConfig>) -> Result<ApiResponse<R>, ApiError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.client.call(self.key, params, config).await
    }
}

/// Generate a typed client struct with one async method per endpoint.
///
/// ```rust,ignore
/// apikit_core::define_client! {
///     /// Users service.
///     pub struct UsersApi {
///         list_users => GET "/users",
///         get_user => GET "/users/:id",
///         create_user => POST "/users",
///     }
/// }
///
/// let api = UsersApi::new(ClientConfig::new("http://localhost:3000"))?;
/// let user: ApiResponse<User> = api.get_user(&json!({"id": 1}), None).await?;
/// ```
///
/// Endpoint names must not collide with the generated `new`,
/// `with_transport`, `endpoints` and `client` functions.
#[macro_export]
macro_rules! define_client {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($key:ident => $method:ident $path:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<Tr = $crate::ReqwestTransport> {
            client: $crate::ApiClient<Tr>,
        }

        impl $name<$crate::ReqwestTransport> {
            pub fn new(config: $crate::ClientConfig) -> ::std::result::Result<Self, $crate::ApiError> {
                ::std::result::Result::Ok(Self {
                    client: $crate::ApiClient::new(config, Self::endpoints())?,
                })
            }
        }

        impl<Tr: $crate::Transport> $name<Tr> {
            pub fn with_transport(base_url: &str, transport: Tr) -> Self {
                Self {
                    client: $crate::ApiClient::with_transport(base_url, Self::endpoints(), transport),
                }
            }

            pub fn endpoints() -> $crate::EndpointMap {
                $crate::endpoints! { $($key => $method $path),* }
            }

            pub fn client(&self) -> &$crate::ApiClient<Tr> {
                &self.client
            }

            $(
                pub async fn $key<P, R>(
                    &self,
                    params: &P,
                    config: ::std::option::Option<$crate::RequestConfig>,
                ) -> ::std::result::Result<$crate::ApiResponse<R>, $crate::ApiError>
                where
                    P: $crate::__private::serde::Serialize + ?Sized,
                    R: $crate::__private::serde::de::DeserializeOwned,
                {
                    self.client.call(stringify!($key), params, config).await
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::{json, Value};
    use tracing_test::traced_test;

    use super::*;
    use crate::endpoints;
    use crate::testing::{response, RecordingTransport};

    fn endpoint_map() -> EndpointMap {
        endpoints! {
            listUsers => GET "/users",
            getUser => GET "/users/:id",
            createUser => POST "/users",
            updateUser => PUT "/users/:id",
            deleteUser => DELETE "/users/:id",
        }
    }

    fn client(responses: Vec<Result<HttpResponse, String>>) -> ApiClient<RecordingTransport> {
        ApiClient::with_transport("http://localhost:3000/", endpoint_map(), RecordingTransport::replying(responses))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn get_sends_params_as_query() {
        let req = client(vec![])
            .build_request("listUsers", &json!({"page": 2, "q": "ada"}), None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/users");
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.query_param("q"), Some("ada"));
        assert!(req.body.is_none());
    }

    #[test]
    fn delete_sends_params_as_query() {
        let req = client(vec![])
            .build_request("deleteUser", &json!({"id": 7, "hard": true}), None)
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/users/7");
        assert_eq!(req.query_param("id"), Some("7"));
        assert_eq!(req.query_param("hard"), Some("true"));
        assert!(req.body.is_none());
    }

    #[test]
    fn post_and_put_send_params_as_body() {
        let c = client(vec![]);
        let req = c.build_request("createUser", &json!({"name": "Ada"}), None).unwrap();
        assert!(req.query.is_empty());
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ada"}));

        let req = c.build_request("updateUser", &json!({"id": 3, "name": "Bo"}), None).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/users/3");
        assert!(req.query.is_empty());
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"id": 3, "name": "Bo"}));
    }

    #[test]
    fn post_without_params_has_no_body() {
        let req = client(vec![]).build_request("createUser", &(), None).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn missing_path_param_resolves_to_empty_segment() {
        let req = client(vec![]).build_request("getUser", &json!({}), None).unwrap();
        assert_eq!(req.url, "http://localhost:3000/users/");
    }

    #[test]
    fn typed_params_fill_placeholders() {
        #[derive(Serialize)]
        struct ById {
            id: u32,
        }
        let req = client(vec![]).build_request("getUser", &ById { id: 42 }, None).unwrap();
        assert_eq!(req.url, "http://localhost:3000/users/42");
    }

    #[test]
    fn default_json_content_type_is_set() {
        let req = client(vec![]).build_request("listUsers", &(), None).unwrap();
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn override_header_is_merged_with_defaults() {
        let config = RequestConfig::new().header("X", "1").timeout(Duration::from_secs(1));
        let req = client(vec![]).build_request("listUsers", &(), Some(config)).unwrap();
        assert_eq!(req.header("X"), Some("1"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn override_query_replaces_generated_params() {
        let config = RequestConfig::new().query("page", "9");
        let req = client(vec![])
            .build_request("listUsers", &json!({"page": 1, "q": "ada"}), Some(config))
            .unwrap();
        assert_eq!(req.query, vec![("page".to_string(), "9".to_string())]);
    }

    #[test]
    fn config_default_headers_are_applied() {
        let config = ClientConfig::new("http://h").default_header("x-client", "apikit");
        let c = ApiClient::with_shared_transport(&config, endpoint_map(), Arc::new(RecordingTransport::default()));
        let req = c.build_request("listUsers", &(), None).unwrap();
        assert_eq!(req.header("x-client"), Some("apikit"));
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let err = client(vec![]).build_request("nope", &(), None).unwrap_err();
        assert_eq!(err.message, "unknown endpoint: nope");
        assert!(err.status.is_none());
    }

    #[test]
    fn parse_response_maps_404() {
        let err = client(vec![])
            .parse_response::<User>(response(404, r#"{"error":"no such user"}"#))
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.data, Some(json!({"error": "no such user"})));
    }

    #[tokio::test]
    async fn call_returns_data_status_and_text() {
        let c = client(vec![Ok(response(200, r#"{"id":1,"name":"Ada"}"#))]);
        let resp: ApiResponse<User> = c.call("getUser", &json!({"id": 1}), None).await.unwrap();
        assert_eq!(resp.data, User { id: 1, name: "Ada".to_string() });
        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");

        let sent = c.transport().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://localhost:3000/users/1");
    }

    #[tokio::test]
    #[traced_test]
    async fn call_rejects_with_status_on_404() {
        let c = client(vec![Ok(response(404, ""))]);
        let err = c.call::<_, User>("getUser", &json!({"id": 9}), None).await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "Request failed with status code 404");
        assert!(logs_contain("request failed"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_api_error() {
        let c = client(vec![Err("connection refused".to_string())]);
        let err = c.call::<_, Value>("listUsers", &(), None).await.unwrap_err();
        assert_eq!(err.message, "connection refused");
        assert!(err.status.is_none());
    }

    #[tokio::test]
    async fn endpoint_handle_calls_through_client() {
        let c = client(vec![Ok(response(201, r#"{"id":5,"name":"Cy"}"#))]);
        let create = c.endpoint("createUser").unwrap();
        assert_eq!(create.descriptor().method, HttpMethod::Post);
        let resp: ApiResponse<User> = create.call(&json!({"name": "Cy"}), None).await.unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.data.id, 5);
        assert!(c.endpoint("missing").is_none());
    }

    #[tokio::test]
    async fn clones_share_one_transport() {
        let c = client(vec![]);
        let other = c.clone();
        let _: ApiResponse<Value> = c.call("listUsers", &(), None).await.unwrap();
        let _: ApiResponse<Value> = other.call("listUsers", &(), None).await.unwrap();
        assert!(Arc::ptr_eq(c.transport(), other.transport()));
        assert_eq!(c.transport().requests().len(), 2);
    }

    crate::define_client! {
        struct UsersApi {
            list_users => GET "/users",
            get_user => GET "/users/:id",
            create_user => POST "/users",
        }
    }

    #[tokio::test]
    async fn generated_client_has_one_method_per_endpoint() {
        let api = UsersApi::with_transport(
            "http://localhost:3000",
            RecordingTransport::replying(vec![Ok(response(200, r#"{"id":2,"name":"Bo"}"#)), Ok(response(201, "{}"))]),
        );
        assert_eq!(UsersApi::<RecordingTransport>::endpoints().len(), 3);

        let user: ApiResponse<User> = api.get_user(&json!({"id": 2}), None).await.unwrap();
        assert_eq!(user.data.name, "Bo");
        let created: ApiResponse<Value> = api.create_user(&json!({"name": "Di"}), None).await.unwrap();
        assert_eq!(created.status, 201);

        let sent = api.client().transport().requests();
        assert_eq!(sent[0].url, "http://localhost:3000/users/2");
        assert_eq!(sent[1].method, HttpMethod::Post);
    }
}
