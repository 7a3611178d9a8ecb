//! Native Meet core logic.
//!
//! Connection lifecycle, track aggregation and media controls for a
//! single-room video meeting client. Talks to the media SDK only through
//! the traits in [`sdk`]; the LiveKit implementation lives behind the
//! `livekit` feature. Consumed by native UI shells via UniFFI bindings.

pub mod client;
pub mod config;
pub mod controls;
pub mod errors;
pub mod events;
pub mod form;
#[cfg(feature = "livekit")]
pub mod livekit;
pub mod sdk;
pub mod session;
pub mod state;
pub mod tracks;
pub mod view;

#[cfg(test)]
mod fake;

pub use client::MeetClient;
pub use config::{ConnectionConfig, JoinOptions};
pub use controls::{CommandOutcome, ControlState, MediaControlController};
pub use errors::{MeetError, Operation, SdkError, ValidationError};
pub use events::{EventEmitter, MeetEvent, MeetEventListener, Notice, NoticeKind};
pub use form::{ConnectionForm, FormView};
pub use sdk::{RoomSession, SessionConnector, SessionEvent, TrackHandle, TrackSource};
pub use session::SessionStateMachine;
pub use state::{ConnectionState, SessionId};
pub use tracks::{TrackAggregator, TrackEntry};
pub use view::{ControlAction, ControlButton, RoomBody, RoomView, TrackTile};
