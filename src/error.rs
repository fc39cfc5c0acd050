//! Error types for drivedav.

use thiserror::Error;

/// Common error type for drivedav.
#[derive(Error, Debug)]
pub enum DriveDavError {
    /// The remote store answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Backend {
        /// HTTP status returned by the remote store.
        status: u16,
        /// Response body or a short description of the failed call.
        message: String,
    },

    /// Access token exchange failed.
    #[error("token error: {0}")]
    Token(String),

    /// Transport-level HTTP failure talking to the remote store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration or request input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The request clashes with an existing object of the other kind.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DriveDavError {
    /// Create a backend error from a status code and message.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        DriveDavError::Backend {
            status,
            message: message.into(),
        }
    }
}

/// Result type alias for drivedav operations.
pub type Result<T> = std::result::Result<T, DriveDavError>;
