//! Bearer token authentication.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::config::AuthKey;
use crate::http::response::ApiError;

/// Reject any request whose `Authorization` header is not exactly
/// `Bearer <auth_key>`.
pub async fn require_bearer(
    State(auth_key): State<AuthKey>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(auth_val) = auth_header {
        if auth_val == format!("Bearer {}", auth_key.expose()) {
            return Ok(next.run(request).await);
        }
    }

    tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
    Err(ApiError::Unauthorized)
}
