//! Document: a text blob held as an ordered sequence of lines.
//!
//! Each line keeps the terminator it was read with, so serializing an
//! unmodified document reproduces the input byte for byte, CRLF included.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checkbox::{CheckState, Checkbox, MARKER_LEN};
use crate::error::{CoreError, Result};
use crate::types::LineIndex;

/// Terminator that followed a line in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// The final segment after the last terminator.
    None,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    ending: LineEnding,
}

/// Outcome of a marker edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerUpdate {
    /// The expected marker was found and replaced.
    Applied,
    /// The expected marker was not at the target position; the line is untouched.
    Mismatch,
}

impl MarkerUpdate {
    pub const fn is_applied(self) -> bool {
        matches!(self, MarkerUpdate::Applied)
    }
}

/// A checklist document.
///
/// Always holds at least one line: the empty text loads as a single empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Line>,
}

impl Document {
    /// Split `text` into lines on `\n` and `\r\n`.
    ///
    /// A trailing terminator yields a final empty line, matching standard
    /// line splitting: `"a\n"` loads as `["a", ""]`.
    pub fn load(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut rest = text;

        while let Some(pos) = rest.find('\n') {
            let segment = &rest[..pos];
            let line = match segment.strip_suffix('\r') {
                Some(stripped) => Line {
                    text: stripped.to_owned(),
                    ending: LineEnding::CrLf,
                },
                None => Line {
                    text: segment.to_owned(),
                    ending: LineEnding::Lf,
                },
            };
            lines.push(line);
            rest = &rest[pos + 1..];
        }

        lines.push(Line {
            text: rest.to_owned(),
            ending: LineEnding::None,
        });

        Self { lines }
    }

    /// Number of lines, including a trailing empty line.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Read a line without its terminator.
    pub fn line(&self, index: LineIndex) -> Option<&str> {
        self.lines.get(index.get()).map(|l| l.text.as_str())
    }

    /// Terminator recorded for a line.
    pub fn line_ending(&self, index: LineIndex) -> Option<LineEnding> {
        self.lines.get(index.get()).map(|l| l.ending)
    }

    /// Iterate over `(index, text)` pairs in document order.
    pub fn lines(&self) -> impl Iterator<Item = (LineIndex, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, l)| (LineIndex(i), l.text.as_str()))
    }

    /// Replace the text of a line, keeping its terminator.
    pub fn replace_line(&mut self, index: LineIndex, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.contains('\n') {
            return Err(CoreError::LineBreakInLine(index));
        }
        let line = self.line_mut(index)?;
        line.text = text;
        Ok(())
    }

    /// Set the checkbox state of a line, locating the marker by the line grammar.
    ///
    /// Lines that are not checkbox lines, or already in the requested state,
    /// are left untouched and reported as [`MarkerUpdate::Mismatch`].
    pub fn set_checked_marker(&mut self, index: LineIndex, checked: bool) -> Result<MarkerUpdate> {
        let offset = match Checkbox::parse(&self.line_mut(index)?.text) {
            Some(checkbox) => checkbox.marker_offset,
            None => return Ok(MarkerUpdate::Mismatch),
        };
        self.set_checked_marker_at(index, offset, checked)
    }

    /// Set the checkbox state using a marker offset captured at extraction.
    ///
    /// Only the three marker bytes are replaced, and only if they currently
    /// hold the opposite marker.
    pub fn set_checked_marker_at(
        &mut self,
        index: LineIndex,
        marker_offset: usize,
        checked: bool,
    ) -> Result<MarkerUpdate> {
        let target = CheckState::from_checked(checked);
        let expected = CheckState::from_checked(!checked);
        let line = self.line_mut(index)?;

        let range = marker_offset..marker_offset + MARKER_LEN;
        if line.text.get(range.clone()) != Some(expected.marker()) {
            return Ok(MarkerUpdate::Mismatch);
        }

        line.text.replace_range(range, target.marker());
        Ok(MarkerUpdate::Applied)
    }

    /// The text of the first `# ` heading, if any.
    pub fn title(&self) -> Option<&str> {
        self.lines.iter().find_map(|l| {
            l.text
                .strip_prefix("# ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
        })
    }

    /// Join the lines back into a single text blob.
    pub fn serialize(&self) -> String {
        let capacity = self
            .lines
            .iter()
            .map(|l| l.text.len() + l.ending.as_str().len())
            .sum();
        let mut out = String::with_capacity(capacity);
        for line in &self.lines {
            out.push_str(&line.text);
            out.push_str(line.ending.as_str());
        }
        out
    }

    fn line_mut(&mut self, index: LineIndex) -> Result<&mut Line> {
        let len = self.lines.len();
        self.lines
            .get_mut(index.get())
            .ok_or(CoreError::InvalidLineIndex { index, len })
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::load(text)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            f.write_str(&line.text)?;
            f.write_str(line.ending.as_str())?;
        }
        Ok(())
    }
}
