//! API Error Handling
//!
//! Unified error types and conversion for API responses. Every error body
//! is `{"error": message, "kind": kind}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dendro_core::CoreError;

use crate::repository::StoreError;
use crate::service::ServiceError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    InvalidState(String),
    ConcurrentModification(String),
    InvariantViolation(String),
    StoreError(StoreError),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::ConcurrentModification(_) => "concurrent_modification",
            ApiError::InvariantViolation(_) => "invariant_violation",
            ApiError::StoreError(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ConcurrentModification(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InvariantViolation(msg) => {
                tracing::error!("Invariant violation: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message, "kind": kind }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            ServiceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::InvalidState(msg) => ApiError::InvalidState(msg),
            ServiceError::ConcurrentModification(msg) => ApiError::ConcurrentModification(msg),
            ServiceError::InvariantViolation(msg) => ApiError::InvariantViolation(msg),
            ServiceError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ServiceError::from(err).into()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
