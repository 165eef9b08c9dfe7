//! In-memory implementation of the DocumentStore trait.
//!
//! This is primarily for testing. Documents live in a map keyed by location,
//! and the next fetch or store can be told to fail with a chosen error.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::{Credentials, DocumentLocation, DocumentStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Documents indexed by location.
    documents: HashMap<DocumentLocation, String>,

    /// Credentials every request must present, if set.
    required: Option<Credentials>,

    /// Errors to return from the next calls.
    fail_next_fetch: Option<StoreError>,
    fail_next_store: Option<StoreError>,

    /// Counters of calls that reached the store.
    fetch_count: usize,
    store_count: usize,
}

impl MemoryStore {
    /// Create a new empty in-memory store that accepts any credentials.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Reject requests whose credentials differ from `credentials`.
    pub fn require_credentials(self, credentials: Credentials) -> Self {
        self.inner.write().unwrap().required = Some(credentials);
        self
    }

    /// Put a document at a location, replacing any previous one.
    pub fn insert(&self, location: &DocumentLocation, text: &str) {
        let mut inner = self.inner.write().unwrap();
        inner.documents.insert(location.clone(), text.to_owned());
    }

    /// Read a document without going through the trait.
    pub fn get(&self, location: &DocumentLocation) -> Option<String> {
        let inner = self.inner.read().unwrap();
        inner.documents.get(location).cloned()
    }

    /// Cause the next fetch to fail with the given error.
    pub fn fail_next_fetch(&self, error: StoreError) {
        self.inner.write().unwrap().fail_next_fetch = Some(error);
    }

    /// Cause the next store to fail with the given error.
    pub fn fail_next_store(&self, error: StoreError) {
        self.inner.write().unwrap().fail_next_store = Some(error);
    }

    /// Number of fetch calls made, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.inner.read().unwrap().fetch_count
    }

    /// Number of store calls made, failed ones included.
    pub fn store_count(&self) -> usize {
        self.inner.read().unwrap().store_count
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn check_credentials(&self, credentials: &Credentials) -> Result<()> {
        match &self.required {
            Some(required) if required != credentials => Err(StoreError::Auth(format!(
                "bad credentials for {}",
                credentials.username()
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(
        &self,
        location: &DocumentLocation,
        credentials: &Credentials,
    ) -> Result<String> {
        let mut inner = self.inner.write().unwrap();
        inner.fetch_count += 1;

        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(error);
        }
        inner.check_credentials(credentials)?;

        inner
            .documents
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    async fn store(
        &self,
        location: &DocumentLocation,
        credentials: &Credentials,
        text: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.store_count += 1;

        if let Some(error) = inner.fail_next_store.take() {
            return Err(error);
        }
        inner.check_credentials(credentials)?;

        inner.documents.insert(location.clone(), text.to_owned());
        Ok(())
    }
}
