//! # Checksync Store
//!
//! Remote document store abstraction. The engine only ever fetches a whole
//! document as text and stores a whole document back; everything about how
//! that happens (WebDAV, HTTP, a local file) lives behind [`DocumentStore`].
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for fetch/store
//! - [`DocumentLocation`] - Where the document lives (typically a URL)
//! - [`Credentials`] - Username and app password, redacted in `Debug`
//! - [`MemoryStore`] - In-memory store with failure injection, for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use checksync_store::{Credentials, DocumentLocation, DocumentStore, MemoryStore};
//!
//! async fn example() {
//!     let location = DocumentLocation::new("https://cloud.example/dav/Checklist.md");
//!     let credentials = Credentials::new("alice", "app-password");
//!
//!     let store = MemoryStore::new();
//!     store.insert(&location, "- [ ] Buy milk\n");
//!
//!     let text = store.fetch(&location, &credentials).await.unwrap();
//!     store.store(&location, &credentials, &text).await.unwrap();
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{Credentials, DocumentLocation, DocumentStore};
