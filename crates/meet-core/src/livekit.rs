//! LiveKit implementation of the session traits.
//!
//! Enabled with the `livekit` feature. Platform shells feed captured audio
//! and video into the native sources exposed by [`LiveKitSession`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use livekit::options::TrackPublishOptions;
use livekit::prelude::*;
use livekit::track::TrackSource as LkTrackSource;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::prelude::*;
use livekit::webrtc::video_source::native::NativeVideoSource;
use tokio::sync::mpsc;

use crate::config::ConnectionConfig;
use crate::errors::SdkError;
use crate::sdk::{
    ParticipantRef, RoomSession, SessionConnection, SessionConnector, SessionEvent, TrackHandle,
    TrackPublication, TrackSource,
};
use crate::session::lock;

const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u32 = 1;
const AUDIO_QUEUE_SIZE_MS: u32 = 100;

const VIDEO_WIDTH: u32 = 1280;
const VIDEO_HEIGHT: u32 = 720;

/// Connects to a LiveKit server with auto-subscribe on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveKitConnector;

impl LiveKitConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionConnector for LiveKitConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<SessionConnection, SdkError> {
        let mut options = RoomOptions::default();
        options.auto_subscribe = true;

        let (room, mut room_events) = Room::connect(&config.url, &config.token, options)
            .await
            .map_err(|e| SdkError::Connect(e.to_string()))?;

        let session = Arc::new(LiveKitSession {
            room: Arc::new(room),
            audio_source: Mutex::new(None),
            video_source: Mutex::new(None),
        });
        tracing::info!("joined room as {}", session.room.local_participant().identity());

        if config.join.microphone_enabled {
            if let Err(e) = session.publish_microphone().await {
                tracing::warn!("joining without microphone: {e}");
            }
        }
        if config.join.camera_enabled {
            if let Err(e) = session.publish_camera().await {
                tracing::warn!("joining without camera: {e}");
            }
        }

        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = room_events.recv().await {
                let Some(event) = translate(event) else {
                    continue;
                };
                let last = matches!(event, SessionEvent::Disconnected { .. });
                if tx.send(event).is_err() || last {
                    break;
                }
            }
            tracing::debug!("room event forwarding stopped");
        });

        Ok(SessionConnection { session, events })
    }
}

/// An open LiveKit room.
pub struct LiveKitSession {
    room: Arc<Room>,
    audio_source: Mutex<Option<NativeAudioSource>>,
    video_source: Mutex<Option<NativeVideoSource>>,
}

impl LiveKitSession {
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Sink for PCM frames from native capture, once the microphone is published.
    pub fn audio_source(&self) -> Option<NativeAudioSource> {
        lock(&self.audio_source).clone()
    }

    /// Sink for captured video frames, once the camera is published.
    pub fn video_source(&self) -> Option<NativeVideoSource> {
        lock(&self.video_source).clone()
    }

    async fn publish_microphone(&self) -> Result<(), SdkError> {
        let source = NativeAudioSource::new(
            AudioSourceOptions {
                echo_cancellation: true,
                noise_suppression: true,
                auto_gain_control: true,
            },
            AUDIO_SAMPLE_RATE,
            AUDIO_CHANNELS,
            AUDIO_QUEUE_SIZE_MS,
        );
        let track =
            LocalAudioTrack::create_audio_track("microphone", RtcAudioSource::Native(source.clone()));

        self.room
            .local_participant()
            .publish_track(
                LocalTrack::Audio(track),
                TrackPublishOptions {
                    source: LkTrackSource::Microphone,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SdkError::Command(format!("publish audio: {e}")))?;

        *lock(&self.audio_source) = Some(source);
        tracing::info!("microphone track published");
        Ok(())
    }

    async fn publish_camera(&self) -> Result<(), SdkError> {
        let source = NativeVideoSource::new(
            VideoResolution {
                width: VIDEO_WIDTH,
                height: VIDEO_HEIGHT,
            },
            false,
        );
        let track =
            LocalVideoTrack::create_video_track("camera", RtcVideoSource::Native(source.clone()));

        self.room
            .local_participant()
            .publish_track(
                LocalTrack::Video(track),
                TrackPublishOptions {
                    source: LkTrackSource::Camera,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SdkError::Command(format!("publish video: {e}")))?;

        *lock(&self.video_source) = Some(source);
        tracing::info!("camera track published");
        Ok(())
    }

    fn local_publication(&self, source: LkTrackSource) -> Option<LocalTrackPublication> {
        self.room
            .local_participant()
            .track_publications()
            .into_values()
            .find(|publication| publication.source() == source)
    }

    fn is_live(&self, source: LkTrackSource) -> bool {
        self.local_publication(source)
            .is_some_and(|publication| !publication.is_muted())
    }

    async fn set_enabled(&self, source: LkTrackSource, enabled: bool) -> Result<(), SdkError> {
        match self.local_publication(source) {
            Some(publication) if enabled => publication.unmute(),
            Some(publication) => publication.mute(),
            None if enabled => match source {
                LkTrackSource::Microphone => self.publish_microphone().await?,
                _ => self.publish_camera().await?,
            },
            None => {}
        }
        Ok(())
    }
}

#[async_trait]
impl RoomSession for LiveKitSession {
    fn tracks(&self) -> Vec<TrackPublication> {
        let local = self.room.local_participant();
        let mut tracks: Vec<_> = local
            .track_publications()
            .values()
            .map(|publication| local_track(&local, publication))
            .collect();

        for participant in self.room.remote_participants().values() {
            for publication in participant.track_publications().values() {
                tracks.push(remote_track(participant, publication));
            }
        }
        tracks
    }

    fn microphone_enabled(&self) -> bool {
        self.is_live(LkTrackSource::Microphone)
    }

    fn camera_enabled(&self) -> bool {
        self.is_live(LkTrackSource::Camera)
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SdkError> {
        self.set_enabled(LkTrackSource::Microphone, enabled).await
    }

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), SdkError> {
        self.set_enabled(LkTrackSource::Camera, enabled).await
    }

    async fn disconnect(&self) -> Result<(), SdkError> {
        self.room
            .close()
            .await
            .map_err(|e| SdkError::Command(e.to_string()))
    }
}

fn source_from_lk(source: LkTrackSource) -> TrackSource {
    match source {
        LkTrackSource::Microphone => TrackSource::Microphone,
        LkTrackSource::Camera => TrackSource::Camera,
        LkTrackSource::Screenshare => TrackSource::ScreenShare,
        _ => TrackSource::Unknown,
    }
}

fn non_empty(name: String) -> Option<String> {
    if name.is_empty() { None } else { Some(name) }
}

fn local_participant_ref(p: &LocalParticipant) -> ParticipantRef {
    ParticipantRef {
        sid: p.sid().to_string(),
        identity: p.identity().to_string(),
        name: non_empty(p.name().to_string()),
        is_local: true,
    }
}

fn remote_participant_ref(p: &RemoteParticipant) -> ParticipantRef {
    ParticipantRef {
        sid: p.sid().to_string(),
        identity: p.identity().to_string(),
        name: non_empty(p.name().to_string()),
        is_local: false,
    }
}

fn remote_track(
    participant: &RemoteParticipant,
    publication: &RemoteTrackPublication,
) -> TrackPublication {
    TrackPublication {
        participant: remote_participant_ref(participant),
        source: source_from_lk(publication.source()),
        track: TrackHandle::new(publication.sid().to_string()),
        subscribed: publication.track().is_some(),
    }
}

fn local_track(
    participant: &LocalParticipant,
    publication: &LocalTrackPublication,
) -> TrackPublication {
    TrackPublication {
        participant: local_participant_ref(participant),
        source: source_from_lk(publication.source()),
        track: TrackHandle::new(publication.sid().to_string()),
        subscribed: true,
    }
}

/// Map a room event onto the session vocabulary. Events the core has no
/// use for yield `None`.
fn translate(event: RoomEvent) -> Option<SessionEvent> {
    let event = match event {
        RoomEvent::TrackPublished { publication, participant } => {
            SessionEvent::TrackPublished(remote_track(&participant, &publication))
        }
        RoomEvent::TrackUnpublished { publication, participant } => {
            SessionEvent::TrackUnpublished(remote_track(&participant, &publication))
        }
        RoomEvent::TrackSubscribed { publication, participant, .. } => {
            let mut track = remote_track(&participant, &publication);
            track.subscribed = true;
            SessionEvent::TrackSubscribed(track)
        }
        RoomEvent::TrackUnsubscribed { publication, participant, .. } => {
            let mut track = remote_track(&participant, &publication);
            track.subscribed = false;
            SessionEvent::TrackUnsubscribed(track)
        }
        RoomEvent::LocalTrackPublished { publication, participant, .. } => {
            SessionEvent::LocalTrackPublished(local_track(&participant, &publication))
        }
        RoomEvent::LocalTrackUnpublished { publication, participant } => {
            SessionEvent::LocalTrackUnpublished(local_track(&participant, &publication))
        }
        RoomEvent::ParticipantConnected(participant) => {
            SessionEvent::ParticipantConnected(remote_participant_ref(&participant))
        }
        RoomEvent::ParticipantDisconnected(participant) => {
            SessionEvent::ParticipantDisconnected(remote_participant_ref(&participant))
        }
        RoomEvent::Disconnected { reason } => SessionEvent::Disconnected {
            reason: format!("{reason:?}"),
        },
        _ => return None,
    };
    Some(event)
}
