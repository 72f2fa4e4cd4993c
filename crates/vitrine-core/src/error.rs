//! Error types for vitrine.

use thiserror::Error;

/// Result type alias using vitrine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vitrine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed or credential missing
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (entity exists but the requester may not see it)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness conflict (duplicate slug)
    #[error("{0}")]
    Conflict(String),

    /// Upload exceeds the configured size ceiling
    #[error("File size exceeds maximum of {limit_mib}MB")]
    PayloadTooLarge {
        /// Configured ceiling in MiB.
        limit_mib: u64,
    },

    /// Upload type matched neither the MIME allowlist nor the extension allowlist
    #[error("File type not allowed: {0}")]
    UnsupportedMediaType(String),

    /// Blob storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
