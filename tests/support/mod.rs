//! In-process mock of the ShareAI backend REST API.
//!
//! Serves the endpoints the client consumes, on an ephemeral port, with a
//! single fixture account. Tokens embed the account id as their subject
//! (`test-token:<user-id>`) so tests can check that a login session belongs
//! to the right account.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use shareai::common::config::ApiConfig;
use shareai::{ApiClient, AuthClient, CatalogClient, Session};

pub const ALICE_ID: &str = "a1b2c3d4-0000-0000-0000-000000000001";
pub const ALICE_PASSWORD: &str = "password123";

/// Which of the three observed shapes the image list answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListShape {
    Envelope,
    Bare,
    Malformed,
}

struct BackendState {
    user: Mutex<Value>,
    password: String,
    images: Vec<Value>,
    collected: Mutex<HashSet<String>>,
    list_shape: Mutex<ListShape>,
    logout_fails: Mutex<bool>,
}

pub struct MockBackend {
    pub base_url: String,
    state: Arc<BackendState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState {
            user: Mutex::new(fixture_user()),
            password: ALICE_PASSWORD.to_string(),
            images: fixture_images(),
            collected: Mutex::new(HashSet::new()),
            list_shape: Mutex::new(ListShape::Envelope),
            logout_fails: Mutex::new(false),
        });

        let app = Router::new()
            .route("/v1/auth/login", post(login))
            .route("/v1/auth/register", post(register))
            .route("/v1/auth/logout", post(logout))
            .route("/v1/users/profile", get(get_profile).put(update_profile))
            .route("/v1/images", get(list_images))
            .route(
                "/v1/images/:id/collect",
                post(collect).delete(uncollect),
            )
            .route("/v1/favorites", get(list_favorites))
            .route("/v1/deploy/:id", get(deploy_info).post(deploy))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Build a session plus wired clients pointed at this backend, with the
    /// token persisted under `state_dir`.
    pub fn clients(&self, state_dir: &Path) -> (Session, AuthClient, CatalogClient) {
        let session = Session::open(state_dir).unwrap();
        let config = ApiConfig {
            base_url: self.base_url.clone(),
            timeout_secs: 5,
        };
        let api = Arc::new(ApiClient::new(&config, session.clone()).unwrap());
        (
            session,
            AuthClient::new(Arc::clone(&api)),
            CatalogClient::new(api),
        )
    }

    pub fn set_list_shape(&self, shape: ListShape) {
        *self.state.list_shape.lock().unwrap() = shape;
    }

    pub fn fail_logout(&self) {
        *self.state.logout_fails.lock().unwrap() = true;
    }

    pub fn current_user_id(&self) -> String {
        self.state.user.lock().unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub fn current_avatar(&self) -> String {
        self.state.user.lock().unwrap()["avatar"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    pub fn collected_ids(&self) -> HashSet<String> {
        self.state.collected.lock().unwrap().clone()
    }
}

fn fixture_user() -> Value {
    json!({
        "id": ALICE_ID,
        "username": "alice",
        "email": "alice@example.test",
        "nickname": "alice",
        "avatar": "",
        "role": "user",
        "created_at": "2025-05-01T10:00:00Z",
        "updated_at": "2025-05-01T10:00:00Z",
    })
}

fn fixture_image(id: &str, name: &str, labels: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} description"),
        "author": ALICE_ID,
        "registry": "docker.io",
        "namespace": "shareai",
        "repository": name,
        "tag": "latest",
        "digest": format!("sha256:{id}"),
        "size": 123_456_789,
        "readme_path": "",
        "stars": 1,
        "visibility": "public",
        "platform": "linux/amd64",
        "labels": labels.iter().map(|l| json!({
            "id": format!("label-{l}"),
            "name": l,
            "created_at": "2025-05-01T10:00:00Z",
            "updated_at": "2025-05-01T10:00:00Z",
        })).collect::<Vec<_>>(),
        "created_at": "2025-05-01T10:00:00Z",
        "updated_at": "2025-05-01T10:00:00Z",
    })
}

fn fixture_images() -> Vec<Value> {
    vec![
        fixture_image("img-1", "stable-diffusion", &["cv", "gpu"]),
        fixture_image("img-2", "llama-server", &["nlp", "gpu"]),
        fixture_image("img-3", "whisper", &["audio"]),
    ]
}

fn token_for(user: &Value) -> String {
    format!("test-token:{}", user["id"].as_str().unwrap())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
}

fn check_auth(state: &BackendState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {}", token_for(&state.user.lock().unwrap()));
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(unauthorized()),
    }
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let user = state.user.lock().unwrap().clone();
    let username_ok = body["username"] == user["username"];
    let password_ok = body["password"].as_str() == Some(state.password.as_str());
    if username_ok && password_ok {
        (
            StatusCode::OK,
            Json(json!({"token": token_for(&user), "user": user})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid username or password"})),
        )
    }
}

async fn register(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let user = json!({
        "id": format!("user-{username}"),
        "username": username,
        "email": body["email"],
        "nickname": username,
        "avatar": "",
        "role": "user",
        "created_at": "2025-05-01T10:00:00Z",
        "updated_at": "2025-05-01T10:00:00Z",
    });
    *state.user.lock().unwrap() = user.clone();
    (
        StatusCode::OK,
        Json(json!({"token": token_for(&user), "user": user})),
    )
}

async fn logout(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }
    if *state.logout_fails.lock().unwrap() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "logout failed"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"message": "Successfully logged out"})),
    )
}

async fn get_profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }
    let user = state.user.lock().unwrap().clone();
    (StatusCode::OK, Json(user))
}

async fn update_profile(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }

    let mut nickname: Option<String> = None;
    let mut avatar: Option<String> = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or_default() {
            "nickname" => nickname = Some(field.text().await.unwrap()),
            "avatar" => {
                let file_name = field.file_name().unwrap_or("avatar").to_string();
                let _bytes = field.bytes().await.unwrap();
                avatar = Some(format!("/uploads/avatars/{file_name}"));
            }
            _ => {}
        }
    }

    let mut user = state.user.lock().unwrap();
    if let Some(nickname) = nickname {
        user["nickname"] = json!(nickname);
    }
    if let Some(avatar) = avatar {
        user["avatar"] = json!(avatar);
    }
    (StatusCode::OK, Json(user.clone()))
}

async fn list_images(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    // A "slow" search lets tests race two fetches deterministically.
    if params.get("search").map(String::as_str) == Some("slow") {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    let search = params.get("search").cloned().unwrap_or_default();
    let matches: Vec<Value> = state
        .images
        .iter()
        .filter(|image| {
            search.is_empty()
                || search == "slow"
                || image["name"].as_str().unwrap_or_default().contains(&search)
        })
        .cloned()
        .collect();

    let shape = *state.list_shape.lock().unwrap();
    let body = match shape {
        ListShape::Envelope => json!({"data": matches, "total": matches.len()}),
        ListShape::Bare => json!(matches),
        ListShape::Malformed => json!({"status": "ok"}),
    };
    (StatusCode::OK, Json(body))
}

async fn collect(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }
    if !state.images.iter().any(|image| image["id"] == id.as_str()) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "image not found"})),
        );
    }
    state.collected.lock().unwrap().insert(id);
    (StatusCode::OK, Json(json!({"message": "collected"})))
}

async fn uncollect(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<String>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }
    state.collected.lock().unwrap().remove(&id);
    (StatusCode::OK, Json(json!({"message": "uncollected"})))
}

async fn list_favorites(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = check_auth(&state, &headers) {
        return e;
    }
    let collected = state.collected.lock().unwrap();
    let matches: Vec<Value> = state
        .images
        .iter()
        .filter(|image| collected.contains(image["id"].as_str().unwrap_or_default()))
        .cloned()
        .collect();
    (
        StatusCode::OK,
        Json(json!({"data": matches, "total": matches.len()})),
    )
}

async fn deploy_info(
    State(state): State<Arc<BackendState>>,
    UrlPath(id): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !state.images.iter().any(|image| image["id"] == id.as_str()) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "image not found"})),
        );
    }
    let provider = params.get("provider_id").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "provider_name": format!("provider-{provider}"),
            "api_url": "https://deploy.example.test/run",
            "params": {},
        })),
    )
}

async fn deploy(
    State(state): State<Arc<BackendState>>,
    UrlPath(id): UrlPath<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !state.images.iter().any(|image| image["id"] == id.as_str()) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "image not found"})),
        );
    }
    let provider = body["provider_id"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "provider_name": format!("provider-{provider}"),
            "api_url": "https://deploy.example.test/run",
            "params": body["params"],
        })),
    )
}
