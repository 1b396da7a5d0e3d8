//! In-process fake of the vSphere `/api` surface.
//!
//! Sessions are handed out as `session-N`; tokens numbered below
//! `valid_from` are answered with 401, which is how tests expire them.
//! Everything else is served from a scripted `(method, path?query)` table
//! and defaults to 404.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use esxi_vsphere::{EsxiService, EsxiServiceState, VsphereConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeState {
    logins: AtomicUsize,
    logouts: AtomicUsize,
    valid_from: AtomicUsize,
    login_delay_ms: AtomicU64,
    reject_login: AtomicBool,
    fail_logout: AtomicBool,
    always_unauthorized: AtomicBool,
    routes: Mutex<HashMap<(String, String), (u16, Value)>>,
    hits: Mutex<Vec<String>>,
}

pub struct FakeVsphere {
    state: Arc<FakeState>,
    pub base_url: String,
}

impl FakeVsphere {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/api/session", post(login).delete(logout))
            .fallback(api)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn config(&self) -> VsphereConfig {
        VsphereConfig {
            host: self.base_url.clone(),
            username: "root".into(),
            password: "secret".into(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    pub fn service(&self) -> EsxiServiceState {
        EsxiService::new(&self.config()).unwrap().into_state()
    }

    /// Script the reply for `method path` (path includes any query).
    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body));
    }

    /// Every non-session request seen, as `"METHOD /path?query"`.
    pub fn hits(&self) -> Vec<String> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        self.hits().iter().filter(|h| **h == wanted).count()
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }

    /// Invalidate every token issued so far.
    pub fn expire_sessions(&self) {
        let next = self.state.logins.load(Ordering::SeqCst) + 1;
        self.state.valid_from.store(next, Ordering::SeqCst);
    }

    pub fn reject_logins(&self) {
        self.state.reject_login.store(true, Ordering::SeqCst);
    }

    pub fn fail_logout(&self) {
        self.state.fail_logout.store(true, Ordering::SeqCst);
    }

    pub fn always_unauthorized(&self) {
        self.state.always_unauthorized.store(true, Ordering::SeqCst);
    }

    pub fn slow_logins(&self, delay: Duration) {
        self.state
            .login_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

async fn login(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("Basic "));
    if !basic || state.reject_login.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error_type": "UNAUTHENTICATED" })),
        )
            .into_response();
    }

    let delay = state.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    (StatusCode::CREATED, Json(json!(format!("session-{n}")))).into_response()
}

async fn logout(State(state): State<Arc<FakeState>>) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn api(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    state
        .hits
        .lock()
        .unwrap()
        .push(format!("{} {}", method.as_str(), path));

    let token_ok = headers
        .get("vmware-api-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|t| t.strip_prefix("session-"))
        .and_then(|n| n.parse::<usize>().ok())
        .map_or(false, |n| n >= state.valid_from.load(Ordering::SeqCst));
    if !token_ok || state.always_unauthorized.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error_type": "UNAUTHENTICATED" })),
        )
            .into_response();
    }

    let scripted = state
        .routes
        .lock()
        .unwrap()
        .get(&(method.as_str().to_string(), path.clone()))
        .cloned();

    match scripted {
        Some((status, Value::Null)) => StatusCode::from_u16(status).unwrap().into_response(),
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), Json(body)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error_type": "NOT_FOUND" })),
        )
            .into_response(),
    }
}
