use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::controls::ControlState;
use crate::state::ConnectionState;
use crate::tracks::TrackEntry;

/// Events emitted by the core to native UI listeners.
#[derive(Debug, Clone)]
pub enum MeetEvent {
    ConnectionStateChanged(ConnectionState),
    TracksChanged(Vec<TrackEntry>),
    ControlStateChanged(ControlState),
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Connection,
    ControlCommand,
    Teardown,
}

/// User-visible message for a locally recovered failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
///
/// Events arrive one at a time, in the order the core committed them. A
/// listener may call back into the client; events raised meanwhile are
/// delivered after it returns.
pub trait MeetEventListener: Send + Sync {
    fn on_event(&self, event: MeetEvent);
}

#[derive(Default)]
struct Dispatch {
    queue: VecDeque<MeetEvent>,
    draining: bool,
}

/// Internal event emitter that dispatches to registered listeners.
///
/// Events are queued in commit order and delivered by a single draining
/// caller, never while a core lock is held.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<RwLock<Vec<Arc<dyn MeetEventListener>>>>,
    dispatch: Arc<Mutex<Dispatch>>,
}

/// Clears the draining flag if a listener panics mid-delivery.
struct DrainGuard<'a> {
    dispatch: &'a Mutex<Dispatch>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatch
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .draining = false;
        }
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn MeetEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn emit(&self, event: MeetEvent) {
        self.enqueue(event);
        self.flush();
    }

    pub fn notice(&self, kind: NoticeKind, message: impl Into<String>) {
        self.emit(MeetEvent::Notice(Notice::new(kind, message)));
    }

    /// Queue `event` without delivering it.
    ///
    /// Call while holding the lock that orders the change, then [`flush`]
    /// once it is released.
    ///
    /// [`flush`]: EventEmitter::flush
    pub(crate) fn enqueue(&self, event: MeetEvent) {
        self.dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .push_back(event);
    }

    /// Deliver queued events unless another caller is already doing so.
    pub(crate) fn flush(&self) {
        {
            let mut dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
            if dispatch.draining || dispatch.queue.is_empty() {
                return;
            }
            dispatch.draining = true;
        }

        let mut guard = DrainGuard {
            dispatch: &self.dispatch,
            armed: true,
        };
        loop {
            let next = {
                let mut dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
                match dispatch.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        dispatch.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            self.deliver(next);
        }
    }

    fn deliver(&self, event: MeetEvent) {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}
