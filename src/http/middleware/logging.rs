//! Request/response logging.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::http::server::X_REQUEST_ID;
use crate::observability::metrics;

/// Log every request on the way in and on the way out, and record request
/// metrics. Headers other than the request ID are never logged.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();

    tracing::info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        "Incoming request"
    );

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Completed request"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}
