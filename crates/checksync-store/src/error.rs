//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The store refused the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No document at the given location.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store answered with a non-success status that is neither of the above.
    #[error("store rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
