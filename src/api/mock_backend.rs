// In-process stand-in for the booking backend, used by the pipeline and
// repository tests.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const VALID_PASSWORD: &str = "secret";

#[derive(Default)]
struct MockState {
    issued: AtomicUsize,
    latest_token: Mutex<Option<String>>,
    hits: Mutex<HashMap<String, usize>>,
    profile_fails: AtomicBool,
    logout_fails: AtomicBool,
}

impl MockState {
    fn hit(&self, path: &str) {
        *self.hits.lock().unwrap().entry(path.to_string()).or_default() += 1;
    }
}

pub struct MockBackend {
    addr: std::net::SocketAddr,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/sanctum/csrf-cookie", get(csrf_cookie))
            .route("/no-csrf", get(|| async { StatusCode::NO_CONTENT }))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/api/cliente/perfil", get(profile).post(update_profile))
            .route("/expired", get(expired))
            .route("/server-error", get(server_error))
            .route("/html", get(html))
            .route("/no-content", delete(|| async { StatusCode::NO_CONTENT }))
            .route("/slow", get(slow))
            .fallback(echo)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of anti-forgery cookies issued so far
    pub fn preflights(&self) -> usize {
        self.state.issued.load(Ordering::SeqCst)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn fail_profile(&self) {
        self.state.profile_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_logout(&self) {
        self.state.logout_fails.store(true, Ordering::SeqCst);
    }
}

async fn csrf_cookie(State(state): State<Arc<MockState>>) -> Response {
    let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let token = format!("token-{n}==");
    *state.latest_token.lock().unwrap() = Some(token);

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        format!("XSRF-TOKEN=token-{n}%3D%3D; Path=/").parse().unwrap(),
    );
    headers.append(
        header::SET_COOKIE,
        "laravel_session=mock-session; Path=/; HttpOnly".parse().unwrap(),
    );
    (StatusCode::NO_CONTENT, headers).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if !email.is_empty() && password == VALID_PASSWORD {
        (StatusCode::OK, Json(json!({ "success": true }))).into_response()
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "These credentials do not match our records." })),
        )
            .into_response()
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    if state.logout_fails.load(Ordering::SeqCst) {
        return server_error().await;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn profile(State(state): State<Arc<MockState>>) -> Response {
    if state.profile_fails.load(Ordering::SeqCst) {
        return Json(json!({ "success": false, "message": "Perfil no disponible" }))
            .into_response();
    }
    Json(json!({
        "success": true,
        "user": {
            "id": 7,
            "name": "Ana",
            "email": "ana@example.com",
            "categoria": "4ta"
        }
    }))
    .into_response()
}

async fn update_profile(headers: HeaderMap, body: Bytes) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": { "id": 7, "name": "Ana María", "email": "ana@example.com" },
        "content_type": header_str(&headers, header::CONTENT_TYPE.as_str()),
        "received": String::from_utf8_lossy(&body),
    }))
}

async fn expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthenticated." })),
    )
        .into_response()
}

async fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "message": "Server Error" })),
    )
        .into_response()
}

async fn html() -> Response {
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Maintenance</body></html>",
    )
        .into_response()
}

async fn slow(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.hit("/slow");
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "success": true }))
}

/// Reflects what the server received
async fn echo(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    state.hit(uri.path());
    let latest = state.latest_token.lock().unwrap().clone();

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "xsrf": header_str(&headers, "x-xsrf-token"),
        "accept": header_str(&headers, header::ACCEPT.as_str()),
        "content_type": header_str(&headers, header::CONTENT_TYPE.as_str()),
        "cookie": header_str(&headers, header::COOKIE.as_str()),
        "body": String::from_utf8_lossy(&body),
        "latest_issued": latest,
    }))
}

fn header_str(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}
