//! Scriptable in-memory SDK for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::config::ConnectionConfig;
use crate::errors::SdkError;
use crate::sdk::{
    RoomSession, SessionConnection, SessionConnector, SessionEvent, TrackPublication,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Microphone(bool),
    Camera(bool),
    Disconnect,
}

pub(crate) enum Reply {
    Fail(String),
    Deferred(oneshot::Receiver<Result<(), SdkError>>),
}

#[derive(Default)]
pub(crate) struct FakeSession {
    calls: Mutex<Vec<Call>>,
    microphone: Mutex<VecDeque<Reply>>,
    camera: Mutex<VecDeque<Reply>>,
    disconnect: Mutex<VecDeque<Reply>>,
    tracks: Mutex<Vec<TrackPublication>>,
    media: Mutex<(bool, bool)>,
    events: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
}

impl FakeSession {
    /// Microphone and camera start enabled.
    pub(crate) fn new() -> Arc<Self> {
        Self::with_media(true, true)
    }

    pub(crate) fn with_media(microphone: bool, camera: bool) -> Arc<Self> {
        let session = Self::default();
        *session.media.lock().unwrap() = (microphone, camera);
        Arc::new(session)
    }

    pub(crate) fn with_tracks(self: Arc<Self>, tracks: Vec<TrackPublication>) -> Arc<Self> {
        *self.tracks.lock().unwrap() = tracks;
        self
    }

    pub(crate) fn connection(self: &Arc<Self>) -> SessionConnection {
        let (tx, events) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        SessionConnection {
            session: self.clone(),
            events,
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Drop the event sender, as the SDK does when the room goes away.
    pub(crate) fn close_events(&self) {
        self.events.lock().unwrap().take();
    }

    pub(crate) fn script_microphone(&self, reply: Reply) {
        self.microphone.lock().unwrap().push_back(reply);
    }

    pub(crate) fn script_microphone_deferred(&self) -> oneshot::Sender<Result<(), SdkError>> {
        let (tx, rx) = oneshot::channel();
        self.script_microphone(Reply::Deferred(rx));
        tx
    }

    pub(crate) fn script_camera(&self, reply: Reply) {
        self.camera.lock().unwrap().push_back(reply);
    }

    pub(crate) fn script_disconnect(&self, reply: Reply) {
        self.disconnect.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn answer(&self, call: Call, queue: &Mutex<VecDeque<Reply>>) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(call);
        let reply = queue.lock().unwrap().pop_front();
        match reply {
            None => Ok(()),
            Some(Reply::Fail(message)) => Err(SdkError::Command(message)),
            Some(Reply::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SdkError::Command("reply dropped".into()))),
        }
    }
}

#[async_trait]
impl RoomSession for FakeSession {
    fn tracks(&self) -> Vec<TrackPublication> {
        self.tracks.lock().unwrap().clone()
    }

    fn microphone_enabled(&self) -> bool {
        self.media.lock().unwrap().0
    }

    fn camera_enabled(&self) -> bool {
        self.media.lock().unwrap().1
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SdkError> {
        self.answer(Call::Microphone(enabled), &self.microphone).await?;
        self.media.lock().unwrap().0 = enabled;
        Ok(())
    }

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SdkError> {
        self.answer(Call::Camera(enabled), &self.camera).await?;
        self.media.lock().unwrap().1 = enabled;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SdkError> {
        self.answer(Call::Disconnect, &self.disconnect).await
    }
}

pub(crate) enum ConnectReply {
    Session(Arc<FakeSession>),
    Fail(String),
    Deferred(oneshot::Receiver<ConnectReply>),
}

/// Hands out scripted sessions; an empty script yields a fresh default one.
#[derive(Default)]
pub(crate) struct FakeConnector {
    replies: Mutex<VecDeque<ConnectReply>>,
    requests: Mutex<Vec<ConnectionConfig>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn script(&self, reply: ConnectReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn script_session(&self, session: Arc<FakeSession>) {
        self.script(ConnectReply::Session(session));
    }

    pub(crate) fn script_deferred(&self) -> oneshot::Sender<ConnectReply> {
        let (tx, rx) = oneshot::channel();
        self.script(ConnectReply::Deferred(rx));
        tx
    }

    pub(crate) fn requests(&self) -> Vec<ConnectionConfig> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<SessionConnection, SdkError> {
        self.requests.lock().unwrap().push(config.clone());
        let mut reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ConnectReply::Session(FakeSession::new()));
        loop {
            match reply {
                ConnectReply::Session(session) => return Ok(session.connection()),
                ConnectReply::Fail(message) => return Err(SdkError::Connect(message)),
                ConnectReply::Deferred(rx) => {
                    reply = rx
                        .await
                        .unwrap_or_else(|_| ConnectReply::Fail("reply dropped".into()));
                }
            }
        }
    }
}
