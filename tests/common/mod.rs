//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use circuit_breaker_service::config::{AuthKey, BreakerConfig};
use circuit_breaker_service::model::{CircuitBreakerEntry, CircuitState, DeviceId};
use circuit_breaker_service::storage::{EntryStorage, MapStorage, Storage};
use circuit_breaker_service::{HttpServer, Shutdown};

pub const AUTH_KEY: &str = "test-secret";

pub type Registry = MapStorage<DeviceId, CircuitBreakerEntry>;

pub fn test_config() -> BreakerConfig {
    let mut config = BreakerConfig::default();
    config.api.server_host = "127.0.0.1".to_string();
    config.api.auth_key = AuthKey::new(AUTH_KEY);
    config.api.graceful_timeout_secs = 2;
    config
}

#[allow(dead_code)]
pub fn bearer() -> String {
    format!("Bearer {}", AUTH_KEY)
}

/// Router over `storage`, configured like a real deployment.
#[allow(dead_code)]
pub fn build_app(storage: Arc<Registry>) -> Router {
    let storage: Arc<EntryStorage> = storage;
    HttpServer::new(&test_config(), storage, Shutdown::new()).router()
}

/// An entry whose `lastChanged` is far in the past, so restamping is visible.
#[allow(dead_code)]
pub fn seeded_entry(device_id: DeviceId, state: CircuitState) -> CircuitBreakerEntry {
    CircuitBreakerEntry {
        device_id,
        state,
        last_changed: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        errors_threshold: 3,
        errors_cnt_reset_timeout_ms: 1_000,
        reset_timeout_ms: 5_000,
    }
}

#[allow(dead_code)]
pub async fn seed(storage: &Registry, entries: impl IntoIterator<Item = CircuitBreakerEntry>) {
    let ctx = CancellationToken::new();
    for entry in entries {
        storage.upsert_entry(&ctx, entry.device_id, entry).await.unwrap();
    }
}

/// Authenticated request with an optional JSON body.
#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer());

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drive one request through the router. Empty or non-JSON bodies come back as `Value::Null`.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

/// Bind an ephemeral port and serve on it in the background.
#[allow(dead_code)]
pub async fn spawn_server(
    storage: Arc<Registry>,
) -> (SocketAddr, Shutdown, JoinHandle<std::io::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let storage: Arc<EntryStorage> = storage;
    let server = HttpServer::new(&test_config(), storage, shutdown.clone());
    let handle = tokio::spawn(server.run(listener));

    (addr, shutdown, handle)
}
