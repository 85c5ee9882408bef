#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use fairchance_api::config::ServerConfig;
use fairchance_api::router::build_app_router;
use fairchance_api::state::AppState;
use fairchance_core::memory::MemoryGateway;
use fairchance_core::profile::MemoryProfiles;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        memory_store: true,
        session_idle_secs: 1800,
    }
}

/// The production router over in-memory stores.
///
/// The router is built once and cloned per request, so per-subject sessions
/// live across requests the way they do in the server. The stores are kept
/// so tests can seed profiles and inject storage faults.
pub struct TestApp {
    pub gateway: Arc<MemoryGateway>,
    pub profiles: Arc<MemoryProfiles>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(MemoryGateway::new()))
    }

    /// A second server over an existing store, with no sessions of its own.
    pub fn with_gateway(gateway: Arc<MemoryGateway>) -> Self {
        let profiles = Arc::new(MemoryProfiles::new());
        let config = test_config();
        let state = AppState::new(gateway.clone(), profiles.clone(), config.clone());
        Self {
            gateway,
            profiles,
            router: build_app_router(state, &config),
        }
    }

    /// A handle to the shared router for one request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with no body.
pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
