//! # Checksync Testkit
//!
//! Testing utilities for checksync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A memory store and a scripted device channel wired to one document
//! - **Generators**: Proptest strategies for checklist documents and failure plans
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use checksync_core::Document;
//! use checksync_testkit::generators::DocumentSpec;
//!
//! proptest! {
//!     #[test]
//!     fn documents_roundtrip(spec: DocumentSpec) {
//!         let text = spec.render();
//!         prop_assert_eq!(Document::load(&text).serialize(), text);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use checksync_testkit::fixtures::{ScriptedChannel, TestFixture, SHOPPING_LIST};
//!
//! // The second protocol message fails twice before it is acknowledged.
//! let fixture = TestFixture::with_channel(SHOPPING_LIST, ScriptedChannel::with_failures([0, 2]));
//! let session = fixture.session(TestFixture::quiet_config());
//! assert!(session.items().is_empty());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{ScriptedChannel, TestFixture, MIXED_LIST, SHOPPING_LIST};
pub use generators::{DocumentSpec, LineSpec};
