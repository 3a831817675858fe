//! Error types for guildhall-store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stored row could not be turned back into a domain value
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for guildhall_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidData(msg) => guildhall_core::Error::Invariant(msg),
            other => guildhall_core::Error::Storage(other.to_string()),
        }
    }
}

/// Lift backend results into the core error type
pub(crate) trait IntoCore<T> {
    fn into_core(self) -> guildhall_core::Result<T>;
}

impl<T, E: Into<StoreError>> IntoCore<T> for std::result::Result<T, E> {
    fn into_core(self) -> guildhall_core::Result<T> {
        self.map_err(|e| {
            let err: StoreError = e.into();
            err.into()
        })
    }
}
