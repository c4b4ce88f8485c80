//! Error responses.
//!
//! Every failure leaving a handler or middleware is an [`ApiError`], rendered
//! as its status code and a `{"error": "<message>"}` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::model::ErrorResponse;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid deviceID")]
    InvalidDeviceId,

    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("Invalid page number")]
    InvalidPage,

    #[error("Invalid page size")]
    InvalidPageSize,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device already exists")]
    DeviceExists,

    #[error("Not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Storage failed for a reason the client cannot fix. The message names
    /// the operation, never the cause.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Translate a storage failure, using `context` as the 500 message.
    pub fn from_storage(err: StorageError, context: &'static str) -> Self {
        match err {
            StorageError::NotFound => Self::DeviceNotFound,
            StorageError::AlreadyExists => Self::DeviceExists,
            StorageError::NotInitialized | StorageError::Cancelled => Self::Internal(context),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidDeviceId | Self::InvalidPayload | Self::InvalidPage | Self::InvalidPageSize => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DeviceNotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::DeviceExists => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
