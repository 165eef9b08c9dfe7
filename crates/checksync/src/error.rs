//! Error types for the sync session.

use checksync_core::CoreError;
use checksync_device::DeviceError;
use checksync_store::StoreError;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Required settings are absent. Sync is not attempted.
    #[error("missing configuration: {}", .missing.join(", "))]
    ConfigurationMissing { missing: Vec<&'static str> },

    /// Fetching the remote document failed.
    #[error("fetch failed: {0}")]
    Fetch(#[source] StoreError),

    /// Storing the edited document failed. In-memory edits are kept.
    #[error("persist failed: {0}")]
    PersistFailed(#[source] StoreError),

    /// Delivering the item list to the device failed.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeviceError),

    /// A device event referenced an index outside the current item list.
    #[error("invalid item index {index} for {len} items")]
    InvalidItemIndex { index: i64, len: usize },

    /// Document error.
    #[error("document error: {0}")]
    Core(#[from] CoreError),

    /// Settings could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No checklist has been loaded yet.
    #[error("no checklist loaded")]
    NotLoaded,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
