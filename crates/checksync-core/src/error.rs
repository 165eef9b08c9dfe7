//! Error types for checksync core.

use thiserror::Error;

use crate::types::LineIndex;

/// Errors that can occur while reading or editing a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid line index {index}: document has {len} lines")]
    InvalidLineIndex { index: LineIndex, len: usize },

    #[error("replacement text for line {0} contains a line break")]
    LineBreakInLine(LineIndex),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
