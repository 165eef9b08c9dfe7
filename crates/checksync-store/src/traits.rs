//! DocumentStore trait: the abstract interface to the remote document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Location of a remote document, typically a WebDAV URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLocation(String);

impl DocumentLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Username and app password for the remote store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Async interface to the remote document.
///
/// Both operations move the whole document as plain text. Each call
/// completes exactly once, with either the result or an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current document text.
    async fn fetch(&self, location: &DocumentLocation, credentials: &Credentials)
        -> Result<String>;

    /// Replace the document with `text`.
    async fn store(
        &self,
        location: &DocumentLocation,
        credentials: &Credentials,
        text: &str,
    ) -> Result<()>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    async fn fetch(
        &self,
        location: &DocumentLocation,
        credentials: &Credentials,
    ) -> Result<String> {
        (**self).fetch(location, credentials).await
    }

    async fn store(
        &self,
        location: &DocumentLocation,
        credentials: &Credentials,
        text: &str,
    ) -> Result<()> {
        (**self).store(location, credentials, text).await
    }
}
