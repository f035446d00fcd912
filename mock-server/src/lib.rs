use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// Partial update; absent fields are left untouched.
#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub active: Option<bool>,
}

impl UpdateUser {
    fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(active) = self.active {
            user.active = active;
        }
    }
}

/// What `/echo` received, sent back as the response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// In-memory user table shared by the `/users` handlers. Listing is ordered
/// by id so responses are stable.
#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<BTreeMap<Uuid, User>>>,
}

impl UserStore {
    pub async fn list(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }

    pub async fn insert(&self, input: CreateUser) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            active: input.active,
        };
        self.users.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn find(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    pub async fn patch(&self, id: Uuid, update: UpdateUser) -> Option<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id)?;
        update.apply_to(user);
        Some(user.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .with_state(UserStore::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn found<T>(user: Option<T>, id: Uuid) -> Result<T, StatusCode> {
    user.ok_or_else(|| {
        tracing::debug!(%id, "no such user");
        StatusCode::NOT_FOUND
    })
}

async fn list_users(State(store): State<UserStore>) -> Json<Vec<User>> {
    Json(store.list().await)
}

async fn create_user(State(store): State<UserStore>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let user = store.insert(input).await;
    tracing::debug!(id = %user.id, "user created");
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(store): State<UserStore>, Path(id): Path<Uuid>) -> Result<Json<User>, StatusCode> {
    found(store.find(id).await, id).map(Json)
}

async fn update_user(
    State(store): State<UserStore>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateUser>,
) -> Result<Json<User>, StatusCode> {
    found(store.patch(id, update).await, id).map(Json)
}

async fn delete_user(State(store): State<UserStore>, Path(id): Path<Uuid>) -> Result<StatusCode, StatusCode> {
    found(store.remove(id).await, id).map(|_| StatusCode::NO_CONTENT)
}

async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: String,
) -> Json<EchoedRequest> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    };

    Json(EchoedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body,
    })
}
