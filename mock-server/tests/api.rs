use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, EchoedRequest, User};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- users ---

#[tokio::test]
async fn list_users_empty() {
    let resp = app().oneshot(empty_request("GET", "/users")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert!(users.is_empty());
}

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"name":"Ada"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: User = body_json(resp).await;
    assert_eq!(user.name, "Ada");
    assert!(!user.active);
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"not_name":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_user_not_found() {
    let resp = app()
        .oneshot(empty_request("GET", "/users/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_user_bad_uuid_returns_400() {
    let resp = app().oneshot(empty_request("GET", "/users/not-a-uuid")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_user_not_found() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/users/00000000-0000-0000-0000-000000000000",
            r#"{"name":"Nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/users", r#"{"name":"Bo"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: User = body_json(resp).await;
    let id = created.id;

    // partial update keeps the name
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/users/{id}"), r#"{"active":true}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: User = body_json(resp).await;
    assert_eq!(updated.name, "Bo");
    assert!(updated.active);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/users/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/users/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_query_and_headers() {
    let req = Request::builder()
        .method("GET")
        .uri("/echo/search?q=rust&tag=a&tag=b")
        .header("x-trace", "abc")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed: EchoedRequest = body_json(resp).await;
    assert_eq!(echoed.method, "GET");
    assert_eq!(echoed.path, "/echo/search");
    assert_eq!(
        echoed.query,
        vec![
            ("q".to_string(), "rust".to_string()),
            ("tag".to_string(), "a".to_string()),
            ("tag".to_string(), "b".to_string()),
        ]
    );
    assert_eq!(echoed.headers.get("x-trace").map(String::as_str), Some("abc"));
    assert!(echoed.body.is_none());
}

#[tokio::test]
async fn echo_reflects_json_body() {
    let resp = app()
        .oneshot(json_request("PUT", "/echo", r#"{"name":"Cy"}"#))
        .await
        .unwrap();

    let echoed: EchoedRequest = body_json(resp).await;
    assert_eq!(echoed.method, "PUT");
    assert_eq!(echoed.body, Some(serde_json::json!({"name": "Cy"})));
    assert_eq!(
        echoed.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
}
