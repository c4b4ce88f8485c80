//! Route handlers.
//!
//! Each handler derives a request context from the shutdown token, so a
//! storage call in flight observes shutdown.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::model::{
    CircuitBreakerEntry, ConfigUpdateRequest, ConfigUpdateResponse, DeviceId, PaginatedResponse,
    ResetResponse,
};
use crate::storage::StorageError;

/// Query string of the list route. Kept as raw strings so bad numbers map to
/// the route's own error messages.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

fn parse_device_id(raw: &str) -> Result<DeviceId, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidDeviceId)
}

/// Segments that fail to percent-decode are as invalid as non-numeric ones.
fn device_id_from_path(path: Result<Path<String>, PathRejection>) -> Result<DeviceId, ApiError> {
    let Path(raw) = path.map_err(|_| ApiError::InvalidDeviceId)?;
    parse_device_id(&raw)
}

/// Decode the body as JSON whatever its `Content-Type` says.
fn decode_update(body: Result<Bytes, BytesRejection>) -> Result<ConfigUpdateRequest, ApiError> {
    let bytes = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable config payload");
        ApiError::InvalidPayload
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        tracing::debug!(error = %err, "Rejected config payload");
        ApiError::InvalidPayload
    })
}

fn parse_positive(raw: Option<&str>, default: usize, err: ApiError) -> Result<usize, ApiError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(err),
        },
    }
}

/// Log a storage failure with its device and convert it.
fn storage_failure(err: StorageError, device_id: Option<DeviceId>, context: &'static str) -> ApiError {
    match err {
        StorageError::NotFound => {
            tracing::debug!(device_id, "Device not found");
        }
        StorageError::AlreadyExists => {
            tracing::warn!(device_id, error = %err, "{context}");
        }
        StorageError::NotInitialized | StorageError::Cancelled => {
            tracing::error!(device_id, error = %err, "{context}");
        }
    }
    ApiError::from_storage(err, context)
}

/// `PUT /circuit-breaker/{device_id}/config`
pub async fn update_config(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
    const CONTEXT: &str = "Failed to update config";

    let device_id = device_id_from_path(path)?;
    let request = decode_update(body)?;

    let ctx = state.cancel.child_token();
    let previous = match state.storage.get_entry(&ctx, &device_id).await {
        Ok(entry) => Some(entry),
        Err(StorageError::NotFound) => None,
        Err(err) => return Err(storage_failure(err, Some(device_id), CONTEXT)),
    };

    let entry = request.into_entry(device_id, previous.as_ref(), &state.defaults, Utc::now());
    state
        .storage
        .upsert_entry(&ctx, device_id, entry.clone())
        .await
        .map_err(|err| storage_failure(err, Some(device_id), CONTEXT))?;

    tracing::info!(
        device_id,
        state = %entry.state,
        created = previous.is_none(),
        "Circuit breaker config updated"
    );
    Ok(Json(entry.into()))
}

/// `POST /circuit-breaker/{device_id}/reset`
pub async fn reset_breaker(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ResetResponse>, ApiError> {
    const CONTEXT: &str = "Failed to reset circuit breaker";

    let device_id = device_id_from_path(path)?;
    let ctx = state.cancel.child_token();

    let mut entry = state
        .storage
        .get_entry(&ctx, &device_id)
        .await
        .map_err(|err| storage_failure(err, Some(device_id), CONTEXT))?;

    let previous_state = entry.state;
    entry.reset(Utc::now());

    state
        .storage
        .upsert_entry(&ctx, device_id, entry.clone())
        .await
        .map_err(|err| storage_failure(err, Some(device_id), CONTEXT))?;

    tracing::info!(device_id, from = %previous_state, "Circuit breaker reset");
    Ok(Json(ResetResponse {
        device_id,
        new_state: entry.state,
    }))
}

/// `GET /circuit-breaker/{device_id}/status`
pub async fn get_status(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<CircuitBreakerEntry>, ApiError> {
    let device_id = device_id_from_path(path)?;
    let ctx = state.cancel.child_token();

    let entry = state
        .storage
        .get_entry(&ctx, &device_id)
        .await
        .map_err(|err| storage_failure(err, Some(device_id), "Failed to retrieve circuit breaker"))?;

    Ok(Json(entry))
}

/// `GET /circuit-breakers/?page=&pageSize=`
///
/// Offset pagination over the full listing, ordered by device ID. A page past
/// the end is empty, not an error.
pub async fn list_breakers(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse>, ApiError> {
    let Query(query) = query.map_err(|_| ApiError::InvalidPage)?;

    let page = parse_positive(query.page.as_deref(), 1, ApiError::InvalidPage)?;
    let page_size = parse_positive(
        query.page_size.as_deref(),
        state.defaults.page_size,
        ApiError::InvalidPageSize,
    )?;

    let ctx = state.cancel.child_token();
    let mut all = state
        .storage
        .get_all_entries(&ctx)
        .await
        .map_err(|err| storage_failure(err, None, "Failed to retrieve circuit breakers"))?;
    all.sort_unstable_by_key(|entry| entry.device_id);

    Ok(Json(PaginatedResponse::from_offset(all, page, page_size)))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Fallback for a known route hit with the wrong method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
