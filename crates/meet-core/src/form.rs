use crate::config::{ConnectionConfig, JoinOptions};
use crate::errors::ValidationError;
use crate::state::ConnectionState;

pub const URL_PLACEHOLDER: &str = "wss://your-livekit-server.com";
pub const TOKEN_PLACEHOLDER: &str = "Enter your access token";

/// Server URL and token as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionForm {
    server_url: String,
    token: String,
    join: JoinOptions,
}

/// Render-ready connect screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub server_url: String,
    pub token: String,
    pub url_accessibility_label: &'static str,
    pub token_accessibility_label: &'static str,
    pub connect_label: &'static str,
    pub connect_accessibility_label: &'static str,
    pub connect_enabled: bool,
    pub error_message: Option<String>,
}

impl ConnectionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.server_url = url.into();
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub fn set_join_options(&mut self, join: JoinOptions) {
        self.join = join;
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Trimmed, validated config ready for the state machine.
    pub fn submit(&self) -> Result<ConnectionConfig, ValidationError> {
        let config = ConnectionConfig::new(self.server_url.trim(), self.token.trim())
            .with_join(self.join);
        config.validate()?;
        Ok(config)
    }

    pub fn view(&self, state: &ConnectionState) -> FormView {
        let connecting = state.is_connecting();
        let error_message = match state {
            ConnectionState::Error { message } => Some(message.clone()),
            _ => None,
        };
        FormView {
            server_url: self.server_url.clone(),
            token: self.token.clone(),
            url_accessibility_label: "LiveKit server URL",
            token_accessibility_label: "Access token",
            connect_label: if connecting { "Connecting..." } else { "Connect" },
            connect_accessibility_label: "Connect to room",
            connect_enabled: !connecting,
            error_message,
        }
    }
}
