//! Connection lifecycle as a pure reducer.
//!
//! [`ConnectionState::reduce`] is the only place transitions are decided.
//! It has no side effects; [`crate::SessionStateMachine`] applies the
//! returned state and performs arming/disarming around it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MeetError, Operation};

/// Identity of one connection attempt, and of the session it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting {
        attempt: SessionId,
    },
    Connected {
        session: SessionId,
    },
    /// Recoverable: left only by submitting a config again.
    Error {
        message: String,
    },
}

/// Inputs to [`ConnectionState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateInput {
    BeginConnect { attempt: SessionId },
    Connected { attempt: SessionId },
    ConnectFailed { attempt: SessionId, message: String },
    Disconnected { session: SessionId },
    /// `session` set: only applies while that session is connected.
    Failed {
        session: Option<SessionId>,
        message: String,
    },
}

impl ConnectionState {
    /// Compute the state that follows `input`.
    ///
    /// Inputs tagged with a [`SessionId`] only apply to that attempt or
    /// session; anything else is rejected as [`MeetError::InvalidState`] and
    /// the caller keeps the current state.
    pub fn reduce(&self, input: &StateInput) -> Result<ConnectionState, MeetError> {
        match (self, input) {
            (Self::Idle | Self::Error { .. }, StateInput::BeginConnect { attempt }) => {
                Ok(Self::Connecting { attempt: *attempt })
            }
            (_, StateInput::BeginConnect { .. }) => {
                Err(MeetError::invalid_state(Operation::BeginConnect, self))
            }

            (Self::Connecting { attempt: current }, StateInput::Connected { attempt })
                if current == attempt =>
            {
                Ok(Self::Connected { session: *attempt })
            }
            (_, StateInput::Connected { .. }) => {
                Err(MeetError::invalid_state(Operation::Connected, self))
            }

            (Self::Connecting { attempt: current }, StateInput::ConnectFailed { attempt, message })
                if current == attempt =>
            {
                Ok(Self::Error { message: message.clone() })
            }
            (_, StateInput::ConnectFailed { .. }) => {
                Err(MeetError::invalid_state(Operation::ConnectFailed, self))
            }

            (Self::Connected { session: current }, StateInput::Disconnected { session })
                if current == session =>
            {
                Ok(Self::Idle)
            }
            (_, StateInput::Disconnected { .. }) => {
                Err(MeetError::invalid_state(Operation::Disconnected, self))
            }

            (Self::Connected { session: current }, StateInput::Failed { session: Some(session), message })
                if current == session =>
            {
                Ok(Self::Error { message: message.clone() })
            }
            (_, StateInput::Failed { session: Some(_), .. }) => {
                Err(MeetError::invalid_state(Operation::SessionFailed, self))
            }
            (_, StateInput::Failed { session: None, message }) => {
                Ok(Self::Error { message: message.clone() })
            }
        }
    }

    /// Session currently armed, if any.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::Connected { session } => Some(*session),
            _ => None,
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. })
    }

    /// States in which the form may be edited and submitted.
    pub fn accepts_config(&self) -> bool {
        matches!(self, Self::Idle | Self::Error { .. })
    }

    /// Whether arriving here tears dependents down.
    pub(crate) fn disarms(&self) -> bool {
        matches!(self, Self::Idle | Self::Error { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting { attempt } => write!(f, "connecting ({attempt})"),
            Self::Connected { session } => write!(f, "connected ({session})"),
            Self::Error { message } => write!(f, "error ({message})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> SessionId {
        SessionId::new(n)
    }

    #[test]
    fn happy_path() {
        let s = ConnectionState::Idle;
        let s = s.reduce(&StateInput::BeginConnect { attempt: id(1) }).unwrap();
        assert_eq!(s, ConnectionState::Connecting { attempt: id(1) });
        let s = s.reduce(&StateInput::Connected { attempt: id(1) }).unwrap();
        assert_eq!(s, ConnectionState::Connected { session: id(1) });
        assert_eq!(s.session(), Some(id(1)));
        let s = s.reduce(&StateInput::Disconnected { session: id(1) }).unwrap();
        assert_eq!(s, ConnectionState::Idle);
    }

    #[test]
    fn begin_connect_rejected_while_busy() {
        let connecting = ConnectionState::Connecting { attempt: id(1) };
        let connected = ConnectionState::Connected { session: id(1) };
        for s in [connecting, connected] {
            let err = s.reduce(&StateInput::BeginConnect { attempt: id(2) }).unwrap_err();
            assert!(matches!(
                err,
                MeetError::InvalidState { operation: Operation::BeginConnect, .. }
            ));
        }
    }

    #[test]
    fn connect_failure_enters_error() {
        let s = ConnectionState::Connecting { attempt: id(3) };
        let s = s
            .reduce(&StateInput::ConnectFailed { attempt: id(3), message: "refused".into() })
            .unwrap();
        assert_eq!(s, ConnectionState::Error { message: "refused".into() });
    }

    #[test]
    fn error_is_left_only_by_begin_connect() {
        let s = ConnectionState::Error { message: "boom".into() };
        assert!(s.reduce(&StateInput::Connected { attempt: id(1) }).is_err());
        assert!(s.reduce(&StateInput::Disconnected { session: id(1) }).is_err());
        assert!(s
            .reduce(&StateInput::ConnectFailed { attempt: id(1), message: "x".into() })
            .is_err());
        let next = s.reduce(&StateInput::BeginConnect { attempt: id(2) }).unwrap();
        assert_eq!(next, ConnectionState::Connecting { attempt: id(2) });
    }

    #[test]
    fn stale_inputs_are_rejected() {
        let s = ConnectionState::Connecting { attempt: id(2) };
        assert!(s.reduce(&StateInput::Connected { attempt: id(1) }).is_err());
        assert!(s
            .reduce(&StateInput::ConnectFailed { attempt: id(1), message: "late".into() })
            .is_err());

        let s = ConnectionState::Connected { session: id(2) };
        assert!(s.reduce(&StateInput::Disconnected { session: id(1) }).is_err());
    }

    #[test]
    fn failure_applies_from_any_state() {
        let states = [
            ConnectionState::Idle,
            ConnectionState::Connecting { attempt: id(1) },
            ConnectionState::Connected { session: id(1) },
            ConnectionState::Error { message: "old".into() },
        ];
        for s in states {
            let next = s.reduce(&StateInput::Failed { session: None, message: "new".into() }).unwrap();
            assert_eq!(next, ConnectionState::Error { message: "new".into() });
        }
    }

    #[test]
    fn session_failure_only_hits_its_own_session() {
        let failed = |n| StateInput::Failed { session: Some(id(n)), message: "kicked".into() };

        let s = ConnectionState::Connected { session: id(1) };
        assert_eq!(s.reduce(&failed(1)).unwrap(), ConnectionState::Error { message: "kicked".into() });

        for s in [
            ConnectionState::Idle,
            ConnectionState::Connecting { attempt: id(2) },
            ConnectionState::Connected { session: id(2) },
        ] {
            let err = s.reduce(&failed(1)).unwrap_err();
            assert!(matches!(
                err,
                MeetError::InvalidState { operation: Operation::SessionFailed, .. }
            ));
        }
    }

    #[test]
    fn serializes_as_tagged_snapshot() {
        let json = serde_json::to_string(&ConnectionState::Connected { session: id(7) }).unwrap();
        assert_eq!(json, r#"{"state":"connected","session":7}"#);
        let back: ConnectionState = serde_json::from_str(r#"{"state":"idle"}"#).unwrap();
        assert_eq!(back, ConnectionState::Idle);
    }
}
