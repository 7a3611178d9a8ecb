//! UniFFI bindings for meet-core.
//!
//! Wraps the core [`meet_core::MeetClient`] and a tokio runtime into a
//! single FFI-safe object backed by LiveKit.

use std::sync::Arc;

use meet_core::{
    self, ConnectionState as CoreConnectionState, ControlAction as CoreControlAction,
    ControlButton as CoreControlButton, ControlState as CoreControlState,
    FormView as CoreFormView, MeetError, MeetEvent as CoreMeetEvent,
    NoticeKind as CoreNoticeKind, RoomBody, RoomView as CoreRoomView, TrackEntry,
    TrackSource as CoreTrackSource, TrackTile as CoreTrackTile,
    form::{TOKEN_PLACEHOLDER, URL_PLACEHOLDER},
    livekit::LiveKitConnector,
};

uniffi::include_scaffolding!("meet");

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing. Call once from the host before using MeetClient.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meet_core=debug,meet_ffi=debug"));
        // The host may already have installed a subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .try_init();
    });
}

// ── FFI-safe type conversions ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error { message: String },
}

impl From<CoreConnectionState> for ConnectionState {
    fn from(s: CoreConnectionState) -> Self {
        match s {
            CoreConnectionState::Idle => Self::Idle,
            CoreConnectionState::Connecting { .. } => Self::Connecting,
            CoreConnectionState::Connected { .. } => Self::Connected,
            CoreConnectionState::Error { message } => Self::Error { message },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Camera,
    ScreenShare,
    Microphone,
    Unknown,
}

impl From<CoreTrackSource> for TrackSource {
    fn from(s: CoreTrackSource) -> Self {
        match s {
            CoreTrackSource::Camera => Self::Camera,
            CoreTrackSource::ScreenShare => Self::ScreenShare,
            CoreTrackSource::Microphone => Self::Microphone,
            CoreTrackSource::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Connection,
    ControlCommand,
    Teardown,
}

impl From<CoreNoticeKind> for NoticeKind {
    fn from(k: CoreNoticeKind) -> Self {
        match k {
            CoreNoticeKind::Validation => Self::Validation,
            CoreNoticeKind::Connection => Self::Connection,
            CoreNoticeKind::ControlCommand => Self::ControlCommand,
            CoreNoticeKind::Teardown => Self::Teardown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ToggleMicrophone,
    ToggleCamera,
    Disconnect,
}

impl From<CoreControlAction> for ControlAction {
    fn from(a: CoreControlAction) -> Self {
        match a {
            CoreControlAction::ToggleMicrophone => Self::ToggleMicrophone,
            CoreControlAction::ToggleCamera => Self::ToggleCamera,
            CoreControlAction::Disconnect => Self::Disconnect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub is_muted: bool,
    pub is_video_enabled: bool,
}

impl From<CoreControlState> for ControlState {
    fn from(s: CoreControlState) -> Self {
        Self {
            is_muted: s.is_muted,
            is_video_enabled: s.is_video_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub participant_id: String,
    pub participant_name: Option<String>,
    pub participant_identity: String,
    pub source: TrackSource,
    pub is_local: bool,
    pub track_sid: String,
}

impl From<TrackEntry> for TrackInfo {
    fn from(t: TrackEntry) -> Self {
        Self {
            track_sid: t.track.sid().to_string(),
            participant_id: t.participant_id,
            participant_name: t.participant_name,
            participant_identity: t.participant_identity,
            source: t.source.into(),
            is_local: t.is_local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTile {
    pub key: String,
    pub label: String,
    pub mirror: bool,
    pub source: TrackSource,
    pub track_sid: String,
}

impl From<CoreTrackTile> for TrackTile {
    fn from(t: CoreTrackTile) -> Self {
        Self {
            track_sid: t.track.sid().to_string(),
            key: t.key,
            label: t.label,
            mirror: t.mirror,
            source: t.source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlButton {
    pub action: ControlAction,
    pub label: String,
    pub accessibility_label: String,
    pub highlighted: bool,
}

impl From<CoreControlButton> for ControlButton {
    fn from(b: CoreControlButton) -> Self {
        Self {
            action: b.action.into(),
            label: b.label.to_string(),
            accessibility_label: b.accessibility_label.to_string(),
            highlighted: b.highlighted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub tiles: Vec<TrackTile>,
    /// Set when there is nothing to render.
    pub empty_message: Option<String>,
    pub controls: Vec<ControlButton>,
}

impl From<CoreRoomView> for RoomView {
    fn from(v: CoreRoomView) -> Self {
        let (tiles, empty_message) = match v.body {
            RoomBody::Empty { message } => (Vec::new(), Some(message.to_string())),
            RoomBody::Tiles(tiles) => (tiles.into_iter().map(TrackTile::from).collect(), None),
        };
        Self {
            tiles,
            empty_message,
            controls: v.controls.into_iter().map(ControlButton::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub server_url: String,
    pub token: String,
    pub url_placeholder: String,
    pub token_placeholder: String,
    pub url_accessibility_label: String,
    pub token_accessibility_label: String,
    pub connect_label: String,
    pub connect_accessibility_label: String,
    pub connect_enabled: bool,
    pub error_message: Option<String>,
}

impl From<CoreFormView> for FormView {
    fn from(v: CoreFormView) -> Self {
        Self {
            server_url: v.server_url,
            token: v.token,
            url_placeholder: URL_PLACEHOLDER.to_string(),
            token_placeholder: TOKEN_PLACEHOLDER.to_string(),
            url_accessibility_label: v.url_accessibility_label.to_string(),
            token_accessibility_label: v.token_accessibility_label.to_string(),
            connect_label: v.connect_label.to_string(),
            connect_accessibility_label: v.connect_accessibility_label.to_string(),
            connect_enabled: v.connect_enabled,
            error_message: v.error_message,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MeetEvent {
    ConnectionStateChanged { state: ConnectionState },
    TracksChanged { tracks: Vec<TrackInfo> },
    ControlStateChanged { state: ControlState },
    Notice { kind: NoticeKind, message: String },
}

impl From<CoreMeetEvent> for MeetEvent {
    fn from(e: CoreMeetEvent) -> Self {
        match e {
            CoreMeetEvent::ConnectionStateChanged(s) => Self::ConnectionStateChanged { state: s.into() },
            CoreMeetEvent::TracksChanged(tracks) => Self::TracksChanged {
                tracks: tracks.into_iter().map(TrackInfo::from).collect(),
            },
            CoreMeetEvent::ControlStateChanged(s) => Self::ControlStateChanged { state: s.into() },
            CoreMeetEvent::Notice(n) => Self::Notice {
                kind: n.kind.into(),
                message: n.message,
            },
        }
    }
}

// ── Error conversion ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum MeetClientError {
    #[error("Validation error: {msg}")]
    Validation { msg: String },
    #[error("Connection error: {msg}")]
    Connect { msg: String },
    #[error("Control error: {msg}")]
    ControlCommand { msg: String },
    #[error("Invalid state: {msg}")]
    InvalidState { msg: String },
    #[error("Runtime error: {msg}")]
    Runtime { msg: String },
}

impl From<MeetError> for MeetClientError {
    fn from(e: MeetError) -> Self {
        tracing::error!("MeetError: {e}");
        let msg = e.to_string();
        match e {
            MeetError::Validation(_) => Self::Validation { msg },
            MeetError::Connect(_) => Self::Connect { msg },
            MeetError::ControlCommand { .. } => Self::ControlCommand { msg },
            MeetError::InvalidState { .. } => Self::InvalidState { msg },
        }
    }
}

// ── Callback interface ───────────────────────────────────────────────

pub trait MeetEventListener: Send + Sync {
    fn on_event(&self, event: MeetEvent);
}

struct BridgeListener {
    ffi_listener: Arc<dyn MeetEventListener>,
}

impl meet_core::MeetEventListener for BridgeListener {
    fn on_event(&self, event: CoreMeetEvent) {
        self.ffi_listener.on_event(event.into());
    }
}

// ── MeetClient: main FFI object ──────────────────────────────────────

pub struct MeetClient {
    inner: meet_core::MeetClient,
    rt: tokio::runtime::Runtime,
}

impl MeetClient {
    pub fn new() -> Result<Self, MeetClientError> {
        let rt = tokio::runtime::Runtime::new().map_err(|e| MeetClientError::Runtime {
            msg: format!("failed to create tokio runtime: {e}"),
        })?;
        Ok(Self {
            inner: meet_core::MeetClient::new(Arc::new(LiveKitConnector::new())),
            rt,
        })
    }

    pub fn set_server_url(&self, url: String) -> Result<(), MeetClientError> {
        self.inner.set_server_url(url).map_err(MeetClientError::from)
    }

    pub fn set_token(&self, token: String) -> Result<(), MeetClientError> {
        self.inner.set_token(token).map_err(MeetClientError::from)
    }

    pub fn set_join_options(
        &self,
        microphone_enabled: bool,
        camera_enabled: bool,
    ) -> Result<(), MeetClientError> {
        self.inner
            .set_join_options(meet_core::JoinOptions {
                microphone_enabled,
                camera_enabled,
            })
            .map_err(MeetClientError::from)
    }

    /// Starts connecting and returns immediately; the outcome arrives as a
    /// `ConnectionStateChanged` event.
    pub fn connect(&self) -> Result<(), MeetClientError> {
        let _guard = self.rt.enter();
        self.inner.connect().map(|_| ()).map_err(MeetClientError::from)
    }

    pub fn toggle_microphone(&self) -> Result<ControlState, MeetClientError> {
        self.rt.block_on(self.inner.toggle_microphone())?;
        Ok(self.inner.control_state().into())
    }

    pub fn toggle_camera(&self) -> Result<ControlState, MeetClientError> {
        self.rt.block_on(self.inner.toggle_camera())?;
        Ok(self.inner.control_state().into())
    }

    pub fn disconnect(&self) -> Result<(), MeetClientError> {
        self.rt
            .block_on(self.inner.disconnect())
            .map_err(MeetClientError::from)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection_state().into()
    }

    pub fn control_state(&self) -> ControlState {
        self.inner.control_state().into()
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.inner.tracks().into_iter().map(TrackInfo::from).collect()
    }

    pub fn room_view(&self) -> RoomView {
        self.inner.room_view().into()
    }

    pub fn form_view(&self) -> FormView {
        self.inner.form_view().into()
    }

    pub fn add_listener(&self, listener: Box<dyn MeetEventListener>) {
        let bridge = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        self.inner.add_listener(bridge);
    }
}
