//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, logging, timeout, body limit, auth)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown, bounded by the grace period

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use uuid::Uuid;

use crate::config::{ApiConfig, BreakerConfig, EntryDefaults};
use crate::http::handlers;
use crate::http::middleware::{log_requests, require_bearer};
use crate::lifecycle::Shutdown;
use crate::storage::EntryStorage;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<EntryStorage>,
    pub defaults: EntryDefaults,
    /// Parent of every request context; cancelled at shutdown.
    pub cancel: CancellationToken,
}

/// Generates a UUID v4 request ID when the client did not send one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// HTTP server for the circuit breaker API.
pub struct HttpServer {
    router: Router,
    config: ApiConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server serving `storage`.
    pub fn new(config: &BreakerConfig, storage: Arc<EntryStorage>, shutdown: Shutdown) -> Self {
        let state = AppState {
            storage,
            defaults: config.defaults.clone(),
            cancel: shutdown.token(),
        };

        Self {
            router: build_router(&config.api, state),
            config: config.api.clone(),
            shutdown,
        }
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// shutdown is triggered.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let token = self.shutdown.token();
        let grace = Duration::from_secs(self.config.graceful_timeout_secs);

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = async {
                token.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Graceful shutdown timed out, dropping open connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Outermost first: request ID, logging, timeout, body limit, auth.
#[allow(deprecated)]
pub fn build_router(config: &ApiConfig, state: AppState) -> Router {
    Router::new()
        .route(
            "/circuit-breaker/{device_id}/config",
            put(handlers::update_config),
        )
        .route(
            "/circuit-breaker/{device_id}/reset",
            post(handlers::reset_breaker),
        )
        .route(
            "/circuit-breaker/{device_id}/status",
            get(handlers::get_status),
        )
        .route("/circuit-breakers/", get(handlers::list_breakers))
        .route("/circuit-breakers", get(handlers::list_breakers))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(middleware::from_fn_with_state(
            config.auth_key.clone(),
            require_bearer,
        ))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestUuid))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(middleware::from_fn(log_requests))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                ))),
        )
        .with_state(state)
}
