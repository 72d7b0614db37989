//! # Store Errors
//!
//! Error types for the state store and its storage backends.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// State store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Malformed input to a mutating operation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation referenced an unknown artist
    #[error("Artist not found: {0}")]
    NotFound(String),

    /// Backing storage could not be reached or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored record failed its checksum or could not be decoded
    #[error("Stored record corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            StoreError::Corrupted(_) => "STORAGE_CORRUPTED",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Validation(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::StorageUnavailable(_) | StoreError::Corrupted(_) => 503,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::StorageUnavailable(msg.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupted(format!("JSON error: {}", e))
    }
}
