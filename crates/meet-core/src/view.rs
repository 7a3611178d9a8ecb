//! Layout for the in-room screen.
//!
//! Pure composition of the aggregated tracks and the control state; the
//! platform shell only draws what [`RoomView::compose`] returns.

use crate::controls::ControlState;
use crate::sdk::{TrackHandle, TrackSource};
use crate::tracks::TrackEntry;

pub const EMPTY_ROOM_MESSAGE: &str = "No video streams available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTile {
    /// `participant_id:source`, unique within one view.
    pub key: String,
    pub label: String,
    /// Local previews are mirrored.
    pub mirror: bool,
    pub source: TrackSource,
    pub track: TrackHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomBody {
    /// No active tracks. Rendered as a message, never as a blank area.
    Empty { message: &'static str },
    Tiles(Vec<TrackTile>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    ToggleMicrophone,
    ToggleCamera,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlButton {
    pub action: ControlAction,
    pub label: &'static str,
    pub accessibility_label: &'static str,
    /// Drawn in the alert colour.
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub body: RoomBody,
    pub controls: Vec<ControlButton>,
}

impl RoomView {
    pub fn compose(tracks: &[TrackEntry], controls: &ControlState) -> Self {
        let body = if tracks.is_empty() {
            RoomBody::Empty { message: EMPTY_ROOM_MESSAGE }
        } else {
            RoomBody::Tiles(tracks.iter().map(tile).collect())
        };

        Self {
            body,
            controls: control_bar(controls),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.body, RoomBody::Empty { .. })
    }
}

fn tile(entry: &TrackEntry) -> TrackTile {
    let mut label = entry.display_name().to_string();
    if entry.is_local {
        label.push_str(" (You)");
    }
    TrackTile {
        key: format!("{}:{}", entry.participant_id, entry.source),
        label,
        mirror: entry.is_local,
        source: entry.source,
        track: entry.track.clone(),
    }
}

fn control_bar(controls: &ControlState) -> Vec<ControlButton> {
    let microphone = if controls.is_muted {
        ControlButton {
            action: ControlAction::ToggleMicrophone,
            label: "Unmute",
            accessibility_label: "Unmute microphone",
            highlighted: true,
        }
    } else {
        ControlButton {
            action: ControlAction::ToggleMicrophone,
            label: "Mute",
            accessibility_label: "Mute microphone",
            highlighted: false,
        }
    };

    let camera = if controls.is_video_enabled {
        ControlButton {
            action: ControlAction::ToggleCamera,
            label: "Stop Video",
            accessibility_label: "Stop video",
            highlighted: false,
        }
    } else {
        ControlButton {
            action: ControlAction::ToggleCamera,
            label: "Start Video",
            accessibility_label: "Start video",
            highlighted: true,
        }
    };

    let disconnect = ControlButton {
        action: ControlAction::Disconnect,
        label: "Disconnect",
        accessibility_label: "Disconnect from room",
        highlighted: true,
    };

    vec![microphone, camera, disconnect]
}
