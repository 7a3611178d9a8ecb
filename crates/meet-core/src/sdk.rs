//! Boundary to the external real-time media SDK.
//!
//! The core never talks to LiveKit (or any other SDK) directly. It drives a
//! [`SessionConnector`] to obtain a [`RoomSession`] plus a stream of
//! [`SessionEvent`]s, and operates only through those.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ConnectionConfig;
use crate::errors::SdkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Camera,
    ScreenShare,
    Microphone,
    Unknown,
}

impl TrackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::ScreenShare => "screen_share",
            Self::Microphone => "microphone",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference a platform renderer resolves to a drawable track.
///
/// Wraps the SDK track SID; the core never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackHandle(String);

impl TrackHandle {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn sid(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRef {
    pub sid: String,
    pub identity: String,
    pub name: Option<String>,
    pub is_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackPublication {
    pub participant: ParticipantRef,
    pub source: TrackSource,
    pub track: TrackHandle,
    /// Remote tracks only become renderable once subscribed. Local tracks
    /// are always reported as subscribed.
    pub subscribed: bool,
}

/// Room events, delivered in SDK order on the session's event channel.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TrackPublished(TrackPublication),
    TrackUnpublished(TrackPublication),
    TrackSubscribed(TrackPublication),
    TrackUnsubscribed(TrackPublication),
    LocalTrackPublished(TrackPublication),
    LocalTrackUnpublished(TrackPublication),
    ParticipantConnected(ParticipantRef),
    ParticipantDisconnected(ParticipantRef),
    Disconnected { reason: String },
    /// Unrecoverable session error.
    Failed { message: String },
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// A live session handle together with its event stream.
pub struct SessionConnection {
    pub session: Arc<dyn RoomSession>,
    pub events: SessionEvents,
}

impl fmt::Debug for SessionConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConnection").finish_non_exhaustive()
    }
}

/// Capability object for an active room connection.
///
/// Lifetime is owned by the SDK; the core drops its reference on teardown.
#[async_trait]
pub trait RoomSession: Send + Sync {
    /// Tracks already present when the session was established.
    fn tracks(&self) -> Vec<TrackPublication>;

    /// Whether the local microphone is currently published and unmuted.
    fn microphone_enabled(&self) -> bool;

    /// Whether the local camera is currently published and unmuted.
    fn camera_enabled(&self) -> bool;

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SdkError>;

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SdkError>;

    async fn disconnect(&self) -> Result<(), SdkError>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<SessionConnection, SdkError>;
}
