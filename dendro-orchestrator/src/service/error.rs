//! Service error type

use dendro_core::CoreError;
use thiserror::Error;

use crate::repository::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    /// Another request changed the record first; safe to retry
    #[error("{0}")]
    ConcurrentModification(String),

    #[error("{0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => ServiceError::InvalidRequest(msg),
            CoreError::Unauthorized(msg) => ServiceError::Unauthorized(msg),
            CoreError::InvalidState(msg) => ServiceError::InvalidState(msg),
            CoreError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            CoreError::Canonicalization(msg) => ServiceError::InvalidRequest(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
