//! Checkbox line grammar.
//!
//! A checkbox line is, after optional leading whitespace:
//!
//! ```text
//! "-" " " MARKER " " name
//! MARKER = "[ ]" | "[x]"
//! ```
//!
//! Only the marker is ever rewritten. Its byte offset is captured when the
//! line is parsed so later edits never have to search the line for it.

use serde::{Deserialize, Serialize};

/// Marker of an outstanding item.
pub const UNCHECKED_MARKER: &str = "[ ]";

/// Marker of a completed item.
pub const CHECKED_MARKER: &str = "[x]";

const BULLET: &str = "- ";

/// Byte length shared by both markers.
pub(crate) const MARKER_LEN: usize = 3;

/// Completion state of a checkbox line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckState {
    Unchecked,
    Checked,
}

impl CheckState {
    pub const fn from_checked(checked: bool) -> Self {
        if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }

    pub const fn is_checked(self) -> bool {
        matches!(self, CheckState::Checked)
    }

    /// The literal marker for this state.
    pub const fn marker(self) -> &'static str {
        match self {
            CheckState::Unchecked => UNCHECKED_MARKER,
            CheckState::Checked => CHECKED_MARKER,
        }
    }
}

/// A parsed checkbox line, borrowing from the line text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkbox<'a> {
    /// Byte offset of the marker's `[` within the line.
    pub marker_offset: usize,
    /// State encoded by the marker.
    pub state: CheckState,
    /// Everything after the separator space, untrimmed.
    pub text: &'a str,
}

impl<'a> Checkbox<'a> {
    /// Parse a single line. Returns `None` if it is not a checkbox line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let body = line.trim_start();
        let indent = line.len() - body.len();

        let rest = body.strip_prefix(BULLET)?;
        let state = if rest.starts_with(UNCHECKED_MARKER) {
            CheckState::Unchecked
        } else if rest.starts_with(CHECKED_MARKER) {
            CheckState::Checked
        } else {
            return None;
        };
        let text = rest[MARKER_LEN..].strip_prefix(' ')?;

        Some(Self {
            marker_offset: indent + BULLET.len(),
            state,
            text,
        })
    }

    /// The item name: the text after the marker, trimmed.
    pub fn name(&self) -> &'a str {
        self.text.trim()
    }
}
