use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::config::JoinOptions;
use crate::controls::{CommandOutcome, ControlState};
use crate::errors::{MeetError, Operation};
use crate::events::{EventEmitter, MeetEventListener, NoticeKind};
use crate::form::{ConnectionForm, FormView};
use crate::sdk::SessionConnector;
use crate::session::{SessionStateMachine, lock};
use crate::state::{ConnectionState, SessionId};
use crate::tracks::TrackEntry;
use crate::view::RoomView;

/// Entry point for a platform shell: one form, one session at a time.
#[derive(Clone)]
pub struct MeetClient {
    form: Arc<Mutex<ConnectionForm>>,
    machine: SessionStateMachine,
    emitter: EventEmitter,
}

impl MeetClient {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        let emitter = EventEmitter::new();
        Self {
            form: Arc::new(Mutex::new(ConnectionForm::new())),
            machine: SessionStateMachine::new(connector, emitter.clone()),
            emitter,
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn MeetEventListener>) {
        self.emitter.add_listener(listener);
    }

    pub fn set_server_url(&self, url: impl Into<String>) -> Result<(), MeetError> {
        self.edit_form(|form| form.set_server_url(url))
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<(), MeetError> {
        self.edit_form(|form| form.set_token(token))
    }

    pub fn set_join_options(&self, join: JoinOptions) -> Result<(), MeetError> {
        self.edit_form(|form| form.set_join_options(join))
    }

    /// Validate the form and start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<SessionId, MeetError> {
        let submitted = lock(&self.form).submit();
        let config = match submitted {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("connect form rejected: {e}");
                self.emitter.notice(NoticeKind::Validation, e.to_string());
                return Err(e.into());
            }
        };
        self.machine.submit(config)
    }

    pub async fn toggle_microphone(&self) -> Result<CommandOutcome, MeetError> {
        self.machine.controls().toggle_microphone().await
    }

    pub async fn toggle_camera(&self) -> Result<CommandOutcome, MeetError> {
        self.machine.controls().toggle_camera().await
    }

    /// Leave the room. The client returns to idle even if the SDK teardown
    /// fails.
    pub async fn disconnect(&self) -> Result<(), MeetError> {
        let session = self.machine.controls().disconnect().await?;
        if let Err(e) = self.machine.on_disconnected(session) {
            // The SDK already reported the disconnect.
            tracing::debug!("{e}");
        }
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.machine.state()
    }

    pub fn control_state(&self) -> ControlState {
        self.machine.controls().state()
    }

    pub fn tracks(&self) -> Vec<TrackEntry> {
        self.machine.tracks()
    }

    pub fn room_view(&self) -> RoomView {
        RoomView::compose(&self.tracks(), &self.control_state())
    }

    pub fn form_view(&self) -> FormView {
        lock(&self.form).view(&self.connection_state())
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.machine.subscribe()
    }

    fn edit_form(&self, edit: impl FnOnce(&mut ConnectionForm)) -> Result<(), MeetError> {
        let state = self.connection_state();
        if !state.accepts_config() {
            tracing::warn!("{} ignored while {state}", Operation::EditConfig);
            return Err(MeetError::invalid_state(Operation::EditConfig, state));
        }
        edit(&mut lock(&self.form));
        Ok(())
    }
}
