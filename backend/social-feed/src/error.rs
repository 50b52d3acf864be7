//! Error types for social-feed

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// One half of a paired follower/following update failed after the other
    /// half was applied. The graph is left asymmetric.
    #[error("Partial graph failure: {0}")]
    PartialGraphFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            e @ (StoreError::BatchTooLarge { .. } | StoreError::InvalidQuery(_)) => {
                ServiceError::InvalidInput(e.to_string())
            }
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
