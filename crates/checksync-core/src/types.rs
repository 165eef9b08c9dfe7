//! Index newtypes.
//!
//! A document has two index spaces that must never be confused: line numbers
//! into the document buffer, and the dense item positions the device uses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 0-based index into a document's line sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineIndex(pub usize);

impl LineIndex {
    /// Get the raw index.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for LineIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// A 0-based position in the most recent extraction.
///
/// Device indices are only meaningful against the item list they were
/// assigned from; a new load invalidates all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceIndex(pub u32);

impl DeviceIndex {
    /// Validate a raw wire index against an item list of `len` entries.
    ///
    /// Returns `None` for negative or out-of-range values.
    pub fn checked(raw: i64, len: usize) -> Option<Self> {
        let index = u32::try_from(raw).ok()?;
        if (index as usize) < len {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Get the index as a `usize` for slice access.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
