//! Common error types for iconstash.

use thiserror::Error;

/// Top-level error type for iconstash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided (bad configuration, missing parameter).
    ///
    /// Raised before any backend I/O is attempted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication against the storage endpoint failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network/transport failure while talking to the backend.
    #[error("Network error: {0}")]
    Network(String),

    /// Failure reported by the storage backend itself.
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error originates from input validation rather than
    /// from an attempted backend operation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
