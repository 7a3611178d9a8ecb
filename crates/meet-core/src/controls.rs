use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::errors::{MeetError, Operation};
use crate::events::{EventEmitter, MeetEvent, NoticeKind};
use crate::session::{ActiveSession, SessionSlot, lock};
use crate::state::SessionId;

/// Local media toggles as last confirmed by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub is_muted: bool,
    pub is_video_enabled: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            is_muted: false,
            is_video_enabled: true,
        }
    }
}

/// Result of a toggle whose SDK call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied(ControlState),
    /// The session was torn down while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone, Copy)]
enum Media {
    Microphone,
    Camera,
}

impl Media {
    fn operation(self) -> Operation {
        match self {
            Self::Microphone => Operation::ToggleMicrophone,
            Self::Camera => Operation::ToggleCamera,
        }
    }
}

/// Serializes same-kind commands. Replaced on every arm, so a call stuck on
/// a torn-down session never blocks the next one.
#[derive(Debug, Clone, Default)]
struct Gates {
    microphone: Arc<tokio::sync::Mutex<()>>,
    camera: Arc<tokio::sync::Mutex<()>>,
}

impl Gates {
    fn get(&self, media: Media) -> Arc<tokio::sync::Mutex<()>> {
        match media {
            Media::Microphone => self.microphone.clone(),
            Media::Camera => self.camera.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct ArmedControls {
    session: Option<SessionId>,
    state: ControlState,
    gates: Gates,
}

/// Mute/unmute, camera on/off and leave, issued against the armed session.
///
/// Toggles are confirmation-gated: the flag only flips once the SDK call has
/// succeeded. Each kind runs behind its own async gate, so a second
/// microphone toggle waits for the first to settle while the camera stays
/// independent.
#[derive(Clone)]
pub struct MediaControlController {
    slot: SessionSlot,
    controls: Arc<Mutex<ArmedControls>>,
    emitter: EventEmitter,
}

impl MediaControlController {
    pub fn new(slot: SessionSlot, emitter: EventEmitter) -> Self {
        Self {
            slot,
            controls: Arc::new(Mutex::new(ArmedControls::default())),
            emitter,
        }
    }

    /// Queues the seeded state; the caller flushes the emitter.
    pub(crate) fn arm(&self, session: SessionId, initial: ControlState) {
        let mut controls = lock(&self.controls);
        *controls = ArmedControls {
            session: Some(session),
            state: initial,
            gates: Gates::default(),
        };
        self.emitter.enqueue(MeetEvent::ControlStateChanged(initial));
    }

    /// Queues the reset state if a session was armed.
    pub(crate) fn disarm(&self) {
        let mut controls = lock(&self.controls);
        if controls.session.is_some() {
            *controls = ArmedControls::default();
            self.emitter.enqueue(MeetEvent::ControlStateChanged(controls.state));
        }
    }

    pub fn state(&self) -> ControlState {
        lock(&self.controls).state
    }

    pub async fn toggle_microphone(&self) -> Result<CommandOutcome, MeetError> {
        self.toggle(Media::Microphone).await
    }

    pub async fn toggle_camera(&self) -> Result<CommandOutcome, MeetError> {
        self.toggle(Media::Camera).await
    }

    /// Tear down the armed session.
    ///
    /// SDK failures are logged and reported as a notice only; the returned
    /// session must still be moved back to idle by the caller.
    pub async fn disconnect(&self) -> Result<SessionId, MeetError> {
        let active = self.active_session(Operation::Disconnect)?;
        match active.handle.disconnect().await {
            Ok(()) => tracing::info!("session {} closed", active.id),
            Err(e) => {
                tracing::warn!("error closing session {}: {e}", active.id);
                self.emitter
                    .notice(NoticeKind::Teardown, format!("error while disconnecting: {e}"));
            }
        }
        Ok(active.id)
    }

    async fn toggle(&self, media: Media) -> Result<CommandOutcome, MeetError> {
        let active = self.active_session(media.operation())?;
        let Some(gate) = self.gate_for(active.id, media) else {
            return Ok(self.discard(media, active.id));
        };
        let _serialized = gate.lock().await;

        let Some(current) = self.state_for(active.id) else {
            return Ok(self.discard(media, active.id));
        };
        let result = match media {
            Media::Microphone => active.handle.set_microphone_enabled(current.is_muted).await,
            Media::Camera => active.handle.set_camera_enabled(!current.is_video_enabled).await,
        };

        let applied = {
            let mut controls = lock(&self.controls);
            if controls.session != Some(active.id) {
                None
            } else {
                if result.is_ok() {
                    match media {
                        Media::Microphone => controls.state.is_muted = !current.is_muted,
                        Media::Camera => {
                            controls.state.is_video_enabled = !current.is_video_enabled;
                        }
                    }
                    self.emitter.enqueue(MeetEvent::ControlStateChanged(controls.state));
                }
                Some(controls.state)
            }
        };
        let Some(state) = applied else {
            return Ok(self.discard(media, active.id));
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "muted: {}, video enabled: {}",
                    state.is_muted,
                    state.is_video_enabled
                );
                self.emitter.flush();
                Ok(CommandOutcome::Applied(state))
            }
            Err(e) => {
                let err = MeetError::ControlCommand {
                    operation: media.operation(),
                    cause: e.to_string(),
                };
                tracing::warn!("{err}");
                self.emitter.notice(NoticeKind::ControlCommand, err.to_string());
                Err(err)
            }
        }
    }

    fn discard(&self, media: Media, session: SessionId) -> CommandOutcome {
        tracing::debug!(
            "discarding {} result for closed session {session}",
            media.operation()
        );
        CommandOutcome::Discarded
    }

    fn active_session(&self, operation: Operation) -> Result<ActiveSession, MeetError> {
        let active = lock(&self.slot).clone();
        match active {
            Some(active) if self.state_for(active.id).is_some() => Ok(active),
            _ => {
                tracing::warn!("{operation} ignored: no active session");
                Err(MeetError::invalid_state(operation, "not connected"))
            }
        }
    }

    fn gate_for(&self, session: SessionId, media: Media) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let controls = lock(&self.controls);
        (controls.session == Some(session)).then(|| controls.gates.get(media))
    }

    fn state_for(&self, session: SessionId) -> Option<ControlState> {
        let controls = lock(&self.controls);
        (controls.session == Some(session)).then_some(controls.state)
    }
}
