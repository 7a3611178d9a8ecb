use std::fmt;

use thiserror::Error;

/// Local, syntactic problems with the connect form. Never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter both URL and token")]
    EmptyFields,
    #[error("please enter a valid WebSocket URL")]
    InvalidUrl(String),
    #[error("URL must use ws:// or wss:// protocol (got {0}://)")]
    UnsupportedScheme(String),
}

/// The command a [`MeetError::ControlCommand`] or
/// [`MeetError::InvalidState`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    BeginConnect,
    Connected,
    ConnectFailed,
    Disconnected,
    SessionFailed,
    EditConfig,
    ToggleMicrophone,
    ToggleCamera,
    Disconnect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginConnect => "begin connect",
            Self::Connected => "connected",
            Self::ConnectFailed => "connect failed",
            Self::Disconnected => "disconnected",
            Self::SessionFailed => "session failed",
            Self::EditConfig => "edit config",
            Self::ToggleMicrophone => "toggle microphone",
            Self::ToggleCamera => "toggle camera",
            Self::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed to {operation}: {cause}")]
    ControlCommand { operation: Operation, cause: String },
    /// Programming-defect guard: the command is not valid in `state`.
    #[error("{operation} is not valid while {state}")]
    InvalidState { operation: Operation, state: String },
}

impl MeetError {
    pub(crate) fn invalid_state(operation: Operation, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }
}

/// Failure reported by the external real-time SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("{0}")]
    Command(String),
}
