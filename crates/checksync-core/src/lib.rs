//! # Checksync Core
//!
//! Pure primitives for checksync: the checklist document, the checkbox line
//! grammar, and item extraction.
//!
//! This crate contains no I/O, no storage, no device messaging. It is pure
//! computation over text.
//!
//! ## Key Types
//!
//! - [`Document`] - A text document held as lines, with their original terminators
//! - [`Checkbox`] - A parsed `- [ ] name` / `- [x] name` line
//! - [`ChecklistItem`] - An outstanding item, addressed on the device by its position
//! - [`LineIndex`] / [`DeviceIndex`] - Newtypes for the two index spaces
//!
//! ## Round-trip
//!
//! `Document::load(text).serialize() == text` for every input. The only edit
//! the engine ever makes is flipping the three-byte marker of an item line.
//!
//! ```rust
//! use checksync_core::{extract, Document};
//!
//! let mut doc = Document::load("- [ ] Buy milk\n- [x] Pay rent\n- [ ] Call Bob\n");
//! let items = extract(&doc);
//! assert_eq!(items.len(), 2);
//!
//! let call_bob = &items[1];
//! doc.set_checked_marker_at(call_bob.source_line, call_bob.marker_offset, true)
//!     .unwrap();
//! assert_eq!(doc.serialize(), "- [ ] Buy milk\n- [x] Pay rent\n- [x] Call Bob\n");
//! ```

pub mod checkbox;
pub mod document;
pub mod error;
pub mod item;
pub mod types;

pub use checkbox::{CheckState, Checkbox, CHECKED_MARKER, UNCHECKED_MARKER};
pub use document::{Document, LineEnding, MarkerUpdate};
pub use error::{CoreError, Result};
pub use item::{extract, ChecklistItem};
pub use types::{DeviceIndex, LineIndex};
