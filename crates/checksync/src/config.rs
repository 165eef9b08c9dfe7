//! Session configuration.
//!
//! [`Settings`] are what the user enters: where the checklist lives and how
//! to log in. [`SyncConfig`] tunes the engine itself.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use checksync_device::{FixedDelay, MessageKeys};
use checksync_store::{Credentials, DocumentLocation};

use crate::error::{Result, SessionError};

pub const WEB_DAV_URL_KEY: &str = "CONFIG_WEB_DAV_URL";
pub const USER_KEY: &str = "CONFIG_USER";
pub const APP_PASSWORD_KEY: &str = "CONFIG_APP_PASSWORD";

/// User-supplied settings. Every field is optional until sync time.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "CONFIG_WEB_DAV_URL", default, skip_serializing_if = "Option::is_none")]
    pub web_dav_url: Option<String>,
    #[serde(rename = "CONFIG_USER", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(rename = "CONFIG_APP_PASSWORD", default, skip_serializing_if = "Option::is_none")]
    pub app_password: Option<String>,
}

impl Settings {
    pub fn new(
        web_dav_url: impl Into<String>,
        user: impl Into<String>,
        app_password: impl Into<String>,
    ) -> Self {
        Self {
            web_dav_url: Some(web_dav_url.into()),
            user: Some(user.into()),
            app_password: Some(app_password.into()),
        }
    }

    /// Parse settings from a JSON object keyed by the config key names.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Load settings from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// The document location and credentials, or every missing key.
    ///
    /// Empty values count as missing.
    pub fn resolve(&self) -> Result<(DocumentLocation, Credentials)> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        let url = present(&self.web_dav_url);
        let user = present(&self.user);
        let password = present(&self.app_password);

        match (url, user, password) {
            (Some(url), Some(user), Some(password)) => Ok((
                DocumentLocation::new(url),
                Credentials::new(user, password),
            )),
            _ => {
                let missing = [
                    (WEB_DAV_URL_KEY, url.is_none()),
                    (USER_KEY, user.is_none()),
                    (APP_PASSWORD_KEY, password.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, absent)| absent.then_some(key))
                .collect();
                Err(SessionError::ConfigurationMissing { missing })
            }
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("web_dav_url", &self.web_dav_url)
            .field("user", &self.user)
            .field("app_password", &self.app_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Retry policy for protocol messages.
    pub retry: FixedDelay,
    /// Numeric ids of the wire dictionary keys.
    pub message_keys: MessageKeys,
    /// Whether to send best-effort status, progress and title messages.
    pub notices: bool,
    /// Fixed list title. Falls back to the document's first heading.
    pub list_title: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: FixedDelay::default(),
            message_keys: MessageKeys::default(),
            notices: true,
            list_title: None,
        }
    }
}
