//! Item extraction: the outstanding checkbox lines of a document.

use serde::{Deserialize, Serialize};

use crate::checkbox::{CheckState, Checkbox};
use crate::document::Document;
use crate::types::LineIndex;

/// An outstanding checklist item.
///
/// Its position in the list returned by [`extract`] is its device index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Trimmed text after the marker.
    pub name: String,
    /// Line the item was read from.
    pub source_line: LineIndex,
    /// Byte offset of the marker within that line.
    pub marker_offset: usize,
    /// Last state requested by the device.
    pub checked: bool,
}

/// Collect every unchecked checkbox line, in document order.
///
/// Checked lines are skipped without leaving a gap: the result is dense and
/// its indices are what the device protocol references.
pub fn extract(document: &Document) -> Vec<ChecklistItem> {
    document
        .lines()
        .filter_map(|(line, text)| {
            let checkbox = Checkbox::parse(text)?;
            (checkbox.state == CheckState::Unchecked).then(|| ChecklistItem {
                name: checkbox.name().to_owned(),
                source_line: line,
                marker_offset: checkbox.marker_offset,
                checked: false,
            })
        })
        .collect()
}
