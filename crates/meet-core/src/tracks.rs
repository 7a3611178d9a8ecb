use serde::Serialize;

use crate::sdk::{SessionEvent, TrackHandle, TrackPublication, TrackSource};
use crate::state::SessionId;

/// One renderable track in the room.
///
/// Unique per `(participant_id, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackEntry {
    pub participant_id: String,
    pub participant_name: Option<String>,
    pub participant_identity: String,
    pub source: TrackSource,
    pub is_local: bool,
    pub track: TrackHandle,
}

impl TrackEntry {
    fn from_publication(publication: &TrackPublication) -> Self {
        Self {
            participant_id: publication.participant.sid.clone(),
            participant_name: publication.participant.name.clone(),
            participant_identity: publication.participant.identity.clone(),
            source: publication.source,
            is_local: publication.participant.is_local,
            track: publication.track.clone(),
        }
    }

    pub fn key(&self) -> (&str, TrackSource) {
        (&self.participant_id, self.source)
    }

    /// Name when the participant set one, identity otherwise.
    pub fn display_name(&self) -> &str {
        match self.participant_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.participant_identity,
        }
    }
}

fn is_renderable(publication: &TrackPublication) -> bool {
    let wanted = matches!(
        publication.source,
        TrackSource::Camera | TrackSource::ScreenShare | TrackSource::Microphone
    );
    wanted && (publication.subscribed || publication.participant.is_local)
}

/// Derived list of visible tracks for the armed session.
///
/// Updated by the session event loop. Read by RoomView through
/// [`TrackAggregator::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct TrackAggregator {
    session: Option<SessionId>,
    entries: Vec<TrackEntry>,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `session`, seeded with the tracks it already has.
    pub fn arm(&mut self, session: SessionId, existing: impl IntoIterator<Item = TrackPublication>) {
        self.session = Some(session);
        self.entries.clear();
        for publication in existing {
            self.upsert(&publication);
        }
    }

    pub fn disarm(&mut self) {
        self.session = None;
        self.entries.clear();
    }

    pub fn armed_session(&self) -> Option<SessionId> {
        self.session
    }

    /// Apply one event from `session`. Returns whether the track set changed.
    ///
    /// Events from any session other than the armed one are dropped.
    pub fn apply(&mut self, session: SessionId, event: &SessionEvent) -> bool {
        if self.session != Some(session) {
            return false;
        }

        match event {
            SessionEvent::TrackPublished(p)
            | SessionEvent::TrackSubscribed(p)
            | SessionEvent::LocalTrackPublished(p) => self.upsert(p),
            SessionEvent::TrackUnpublished(p)
            | SessionEvent::TrackUnsubscribed(p)
            | SessionEvent::LocalTrackUnpublished(p) => self.remove(&p.participant.sid, p.source),
            SessionEvent::ParticipantDisconnected(participant) => {
                let before = self.entries.len();
                self.entries.retain(|e| e.participant_id != participant.sid);
                self.entries.len() != before
            }
            SessionEvent::ParticipantConnected(_)
            | SessionEvent::Disconnected { .. }
            | SessionEvent::Failed { .. } => false,
        }
    }

    fn upsert(&mut self, publication: &TrackPublication) -> bool {
        if !is_renderable(publication) {
            return false;
        }
        let entry = TrackEntry::from_publication(publication);
        match self.entries.iter_mut().find(|e| e.key() == entry.key()) {
            Some(existing) if *existing == entry => false,
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.entries.push(entry);
                true
            }
        }
    }

    fn remove(&mut self, participant_id: &str, source: TrackSource) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != (participant_id, source));
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<TrackEntry> {
        self.entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::ParticipantRef;

    const S1: SessionId = SessionId::new(1);

    fn participant(sid: &str, is_local: bool) -> ParticipantRef {
        ParticipantRef {
            sid: sid.to_string(),
            identity: format!("identity-{sid}"),
            name: Some(format!("name-{sid}")),
            is_local,
        }
    }

    fn publication(sid: &str, source: TrackSource, subscribed: bool) -> TrackPublication {
        TrackPublication {
            participant: participant(sid, false),
            source,
            track: TrackHandle::new(format!("TR_{sid}_{source}")),
            subscribed,
        }
    }

    fn armed() -> TrackAggregator {
        let mut agg = TrackAggregator::new();
        agg.arm(S1, []);
        agg
    }

    #[test]
    fn publish_then_unpublish_leaves_no_entry() {
        let mut agg = armed();
        let camera = publication("P", TrackSource::Camera, true);
        assert!(agg.apply(S1, &SessionEvent::TrackPublished(camera.clone())));
        assert_eq!(agg.entries().len(), 1);
        assert!(agg.apply(S1, &SessionEvent::TrackUnpublished(camera)));
        assert!(agg.entries().iter().all(|e| e.key() != ("P", TrackSource::Camera)));
        assert!(agg.is_empty());
    }

    #[test]
    fn unsubscribed_tracks_are_not_listed() {
        let mut agg = armed();
        let camera = publication("P", TrackSource::Camera, false);
        assert!(!agg.apply(S1, &SessionEvent::TrackPublished(camera.clone())));
        assert!(agg.is_empty());

        let subscribed = TrackPublication { subscribed: true, ..camera };
        assert!(agg.apply(S1, &SessionEvent::TrackSubscribed(subscribed)));
        assert_eq!(agg.entries().len(), 1);
    }

    #[test]
    fn unsubscribe_evicts_only_that_source() {
        let mut agg = armed();
        for source in [TrackSource::Camera, TrackSource::Microphone] {
            assert!(agg.apply(S1, &SessionEvent::TrackSubscribed(publication("P", source, true))));
        }
        assert_eq!(agg.entries().len(), 2);

        let camera = publication("P", TrackSource::Camera, false);
        assert!(agg.apply(S1, &SessionEvent::TrackUnsubscribed(camera)));

        let keys: Vec<_> = agg.entries().iter().map(TrackEntry::key).collect();
        assert_eq!(keys, vec![("P", TrackSource::Microphone)]);
    }

    #[test]
    fn unknown_sources_are_ignored() {
        let mut agg = armed();
        let other = publication("P", TrackSource::Unknown, true);
        assert!(!agg.apply(S1, &SessionEvent::TrackSubscribed(other)));
        assert!(agg.is_empty());
    }

    #[test]
    fn one_entry_per_participant_and_source() {
        let mut agg = armed();
        let first = publication("P", TrackSource::Camera, true);
        let second = TrackPublication {
            track: TrackHandle::new("TR_new"),
            ..first.clone()
        };
        agg.apply(S1, &SessionEvent::TrackSubscribed(first.clone()));
        assert!(!agg.apply(S1, &SessionEvent::TrackSubscribed(first)));
        assert!(agg.apply(S1, &SessionEvent::TrackSubscribed(second)));
        assert_eq!(agg.entries().len(), 1);
        assert_eq!(agg.entries()[0].track.sid(), "TR_new");
    }

    #[test]
    fn participant_departure_evicts_all_their_tracks() {
        let mut agg = armed();
        for source in [TrackSource::Camera, TrackSource::Microphone, TrackSource::ScreenShare] {
            agg.apply(S1, &SessionEvent::TrackSubscribed(publication("P", source, true)));
        }
        agg.apply(S1, &SessionEvent::TrackSubscribed(publication("Q", TrackSource::Camera, true)));
        assert_eq!(agg.entries().len(), 4);

        assert!(agg.apply(S1, &SessionEvent::ParticipantDisconnected(participant("P", false))));
        let keys: Vec<_> = agg.entries().iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec![("Q", TrackSource::Camera)]);
    }

    #[test]
    fn keeps_insertion_order() {
        let mut agg = armed();
        agg.apply(S1, &SessionEvent::TrackSubscribed(publication("B", TrackSource::Camera, true)));
        agg.apply(S1, &SessionEvent::TrackSubscribed(publication("A", TrackSource::Camera, true)));
        let ids: Vec<_> = agg.entries().iter().map(|e| e.participant_id.as_str()).collect();
        assert_eq!(ids, ["B", "A"]);
    }

    #[test]
    fn local_tracks_are_listed_without_subscription() {
        let mut agg = armed();
        let local = TrackPublication {
            participant: participant("me", true),
            source: TrackSource::Camera,
            track: TrackHandle::new("TR_local"),
            subscribed: false,
        };
        assert!(agg.apply(S1, &SessionEvent::LocalTrackPublished(local.clone())));
        assert!(agg.entries()[0].is_local);
        assert!(agg.apply(S1, &SessionEvent::LocalTrackUnpublished(local)));
        assert!(agg.is_empty());
    }

    #[test]
    fn events_from_other_sessions_are_dropped() {
        let mut agg = armed();
        let stale = SessionId::new(0);
        let camera = publication("P", TrackSource::Camera, true);
        assert!(!agg.apply(stale, &SessionEvent::TrackSubscribed(camera.clone())));
        assert!(agg.is_empty());

        agg.disarm();
        assert!(!agg.apply(S1, &SessionEvent::TrackSubscribed(camera)));
        assert!(agg.armed_session().is_none());
    }

    #[test]
    fn arm_seeds_existing_tracks_and_resets() {
        let mut agg = armed();
        agg.apply(S1, &SessionEvent::TrackSubscribed(publication("old", TrackSource::Camera, true)));

        let s2 = SessionId::new(2);
        agg.arm(
            s2,
            [
                publication("P", TrackSource::Camera, true),
                publication("Q", TrackSource::Microphone, false),
            ],
        );
        let ids: Vec<_> = agg.entries().iter().map(|e| e.participant_id.as_str()).collect();
        assert_eq!(ids, ["P"]);
        assert_eq!(agg.armed_session(), Some(s2));
    }

    #[test]
    fn display_name_falls_back_to_identity() {
        let mut p = publication("P", TrackSource::Camera, true);
        p.participant.name = Some(String::new());
        let entry = TrackEntry::from_publication(&p);
        assert_eq!(entry.display_name(), "identity-P");
    }
}
