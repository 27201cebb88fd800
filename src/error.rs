use thiserror::Error;

use crate::patient::ValidationError;
use crate::storage::StorageError;

/// Failures surfaced by record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Patient not found: {0}")]
    NotFound(String),
    #[error("Patient already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Internal error: {0}")]
    Internal(String),
}
