//! # Checksync
//!
//! Keeps a checklist document in a remote store in step with a small
//! companion display device.
//!
//! ## Overview
//!
//! A [`SyncSession`] fetches the document, extracts its outstanding
//! `- [ ] name` lines, and streams them to the device one acknowledged
//! message at a time. When the user ticks an item on the device, the
//! session flips that line's marker and stores the document back. Nothing
//! else in the document is ever touched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use checksync::{Settings, SyncConfig, SyncSession};
//! use checksync::device::{memory, FramedChannel, MessageKeys};
//! use checksync::store::MemoryStore;
//!
//! async fn example() {
//!     let settings = Settings::new("https://dav.example/Checklist.md", "alice", "app-password");
//!     let config = SyncConfig::default();
//!
//!     let (link, _device) = memory::link(16);
//!     let channel = FramedChannel::new(link, MessageKeys::default());
//!
//!     let mut session = SyncSession::new(MemoryStore::new(), channel, settings, config);
//!     session.run().await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `checksync::core` - Document model and item extraction
//! - `checksync::store` - Remote document store abstraction
//! - `checksync::device` - Device messages, channel, and delivery protocol

pub mod config;
pub mod error;
pub mod session;

// Re-export component crates
pub use checksync_core as core;
pub use checksync_device as device;
pub use checksync_store as store;

pub use config::{Settings, SyncConfig};
pub use error::{Result, SessionError};
pub use session::{EventOutcome, SessionState, SyncReport, SyncSession};

// Re-export commonly used component types
pub use checksync_core::{extract, ChecklistItem, DeviceIndex, Document, LineIndex};
pub use checksync_device::{DeviceChannel, DeviceEvent, FixedDelay, OutboundMessage, RetryPolicy};
pub use checksync_store::{Credentials, DocumentLocation, DocumentStore};
