use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ValidationError;

/// Which local tracks to publish as soon as the room is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOptions {
    #[serde(default = "default_true")]
    pub microphone_enabled: bool,
    #[serde(default = "default_true")]
    pub camera_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            microphone_enabled: true,
            camera_enabled: true,
        }
    }
}

/// Everything needed to open a room session.
///
/// Built by [`crate::ConnectionForm::submit`] and frozen once a connection
/// attempt starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    pub token: String,
    #[serde(default)]
    pub join: JoinOptions,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            join: JoinOptions::default(),
        }
    }

    pub fn with_join(mut self, join: JoinOptions) -> Self {
        self.join = join;
        self
    }

    /// Syntactic checks only: both fields present, URL is `ws://` or `wss://`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() || self.token.trim().is_empty() {
            return Err(ValidationError::EmptyFields);
        }

        let url = Url::parse(self.url.trim())
            .map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
    }
}
