use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::config::ConnectionConfig;
use crate::controls::{ControlState, MediaControlController};
use crate::errors::MeetError;
use crate::events::{EventEmitter, MeetEvent, NoticeKind};
use crate::sdk::{RoomSession, SessionConnection, SessionConnector, SessionEvent, SessionEvents};
use crate::state::{ConnectionState, SessionId, StateInput};
use crate::tracks::{TrackAggregator, TrackEntry};

/// The armed session handle and the attempt it belongs to.
#[derive(Clone)]
pub struct ActiveSession {
    pub id: SessionId,
    pub handle: Arc<dyn RoomSession>,
}

/// Single owner of the live session handle.
///
/// Only [`SessionStateMachine`] populates or clears it. Everyone else reads
/// through it on each use and treats `None` as disarmed.
pub type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives the connection lifecycle of one client.
///
/// Transitions are decided by [`ConnectionState::reduce`] and applied under
/// the state lock together with their arming/disarming side effects, so the
/// aggregator and controller never observe a session the state does not
/// hold. The lock is never held across an `.await`.
#[derive(Clone)]
pub struct SessionStateMachine {
    connector: Arc<dyn SessionConnector>,
    state: Arc<Mutex<ConnectionState>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    config: Arc<Mutex<Option<ConnectionConfig>>>,
    slot: SessionSlot,
    tracks: Arc<Mutex<TrackAggregator>>,
    controls: MediaControlController,
    next_attempt: Arc<AtomicU64>,
    emitter: EventEmitter,
}

impl SessionStateMachine {
    pub fn new(connector: Arc<dyn SessionConnector>, emitter: EventEmitter) -> Self {
        let slot = SessionSlot::default();
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            state: Arc::new(Mutex::new(ConnectionState::Idle)),
            state_tx: Arc::new(state_tx),
            config: Arc::new(Mutex::new(None)),
            controls: MediaControlController::new(slot.clone(), emitter.clone()),
            slot,
            tracks: Arc::new(Mutex::new(TrackAggregator::new())),
            next_attempt: Arc::new(AtomicU64::new(1)),
            emitter,
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    /// Watch every committed state.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Config of the current or most recent attempt.
    pub fn config(&self) -> Option<ConnectionConfig> {
        lock(&self.config).clone()
    }

    pub fn controls(&self) -> &MediaControlController {
        &self.controls
    }

    pub fn tracks(&self) -> Vec<TrackEntry> {
        lock(&self.tracks).snapshot()
    }

    /// Validate `config` and, if it passes, start connecting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, config: ConnectionConfig) -> Result<SessionId, MeetError> {
        config.validate()?;
        self.begin_connect(config)
    }

    /// Move to `connecting` and hand `config` to the SDK without waiting for
    /// the outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_connect(&self, config: ConnectionConfig) -> Result<SessionId, MeetError> {
        let attempt = SessionId::new(self.next_attempt.fetch_add(1, Ordering::Relaxed));
        self.apply(StateInput::BeginConnect { attempt }, || {
            *lock(&self.config) = Some(config.clone());
        })
        .inspect_err(|e| tracing::warn!("{e}"))?;

        tracing::info!("connecting to {} (attempt {attempt})", config.url);
        let machine = self.clone();
        tokio::spawn(async move {
            let outcome = match machine.connector.connect(&config).await {
                Ok(connection) => machine.on_connected(attempt, connection),
                Err(e) => machine.on_connect_failed(attempt, e.to_string()),
            };
            if let Err(e) = outcome {
                tracing::debug!("connect result for attempt {attempt} discarded: {e}");
            }
        });

        Ok(attempt)
    }

    /// Arm dependents with the session produced by `attempt`.
    ///
    /// A session for a superseded attempt is released instead.
    pub fn on_connected(
        &self,
        attempt: SessionId,
        connection: SessionConnection,
    ) -> Result<(), MeetError> {
        let SessionConnection { session, events } = connection;

        let result = self.apply(StateInput::Connected { attempt }, || {
            *lock(&self.slot) = Some(ActiveSession {
                id: attempt,
                handle: session.clone(),
            });
            {
                let mut tracks = lock(&self.tracks);
                tracks.arm(attempt, session.tracks());
                self.emitter.enqueue(MeetEvent::TracksChanged(tracks.snapshot()));
            }
            self.controls.arm(
                attempt,
                ControlState {
                    is_muted: !session.microphone_enabled(),
                    is_video_enabled: session.camera_enabled(),
                },
            );
        });

        if let Err(e) = result {
            tokio::spawn(async move {
                if let Err(e) = session.disconnect().await {
                    tracing::warn!("error releasing superseded session {attempt}: {e}");
                }
            });
            return Err(e);
        }

        let machine = self.clone();
        tokio::spawn(async move { machine.event_loop(attempt, events).await });
        Ok(())
    }

    pub fn on_connect_failed(&self, attempt: SessionId, message: String) -> Result<(), MeetError> {
        self.apply(
            StateInput::ConnectFailed {
                attempt,
                message: message.clone(),
            },
            || {},
        )?;
        tracing::warn!("connect attempt {attempt} failed: {message}");
        self.emitter.notice(NoticeKind::Connection, message);
        Ok(())
    }

    pub fn on_disconnected(&self, session: SessionId) -> Result<(), MeetError> {
        self.apply(StateInput::Disconnected { session }, || {})?;
        Ok(())
    }

    /// Unrecoverable error from any state.
    pub fn on_error(&self, message: String) {
        self.fail(None, message);
    }

    /// Unrecoverable error reported by `session`. Ignored unless that
    /// session is still the connected one.
    pub fn on_session_error(&self, session: SessionId, message: String) {
        self.fail(Some(session), message);
    }

    fn fail(&self, session: Option<SessionId>, message: String) {
        let input = StateInput::Failed {
            session,
            message: message.clone(),
        };
        match self.apply(input, || {}) {
            Ok(_) => {
                tracing::error!("session error: {message}");
                self.emitter.notice(NoticeKind::Connection, message);
            }
            Err(e) if session.is_some() => tracing::debug!("stale session error dropped: {e}"),
            Err(e) => tracing::warn!("{e}"),
        }
    }

    /// Reduce `input` against the current state and commit the result.
    ///
    /// `on_commit` runs under the state lock just before the new state is
    /// stored; entering `idle` or `error` disarms dependents in the same
    /// critical section. Listener events are queued inside it, in commit
    /// order, and delivered once the lock is released.
    fn apply(
        &self,
        input: StateInput,
        on_commit: impl FnOnce(),
    ) -> Result<ConnectionState, MeetError> {
        let next = {
            let mut state = lock(&self.state);
            let next = state.reduce(&input)?;
            self.emitter
                .enqueue(MeetEvent::ConnectionStateChanged(next.clone()));
            on_commit();
            if next.disarms() {
                self.disarm();
            }
            *state = next.clone();
            self.state_tx.send_replace(next.clone());
            next
        };

        tracing::info!("connection state: {next}");
        self.emitter.flush();
        Ok(next)
    }

    fn disarm(&self) {
        if lock(&self.slot).take().is_none() {
            return;
        }
        {
            let mut tracks = lock(&self.tracks);
            tracks.disarm();
            self.emitter.enqueue(MeetEvent::TracksChanged(Vec::new()));
        }
        self.controls.disarm();
    }

    async fn event_loop(self, session: SessionId, mut events: SessionEvents) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Disconnected { reason } => {
                    tracing::info!("session {session} disconnected: {reason}");
                    if let Err(e) = self.on_disconnected(session) {
                        tracing::debug!("{e}");
                    }
                    return;
                }
                SessionEvent::Failed { message } => {
                    self.on_session_error(session, message);
                    return;
                }
                other => {
                    let changed = {
                        let mut tracks = lock(&self.tracks);
                        let changed = tracks.apply(session, &other);
                        if changed {
                            self.emitter.enqueue(MeetEvent::TracksChanged(tracks.snapshot()));
                        }
                        changed
                    };
                    if changed {
                        self.emitter.flush();
                    } else if self.state().session() != Some(session) {
                        tracing::debug!("session {session} no longer armed, dropping events");
                        return;
                    } else {
                        tracing::debug!("ignored session event: {other:?}");
                    }
                }
            }
        }

        if self.state().session() == Some(session) {
            tracing::info!("event stream for session {session} closed");
            if let Err(e) = self.on_disconnected(session) {
                tracing::debug!("{e}");
            }
        }
        tracing::debug!("session {session} event loop ended");
    }
}
