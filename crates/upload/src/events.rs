//! Single-subscriber signal slots with replay.
//!
//! Each signal kind owns one [`EventSlot`]: at most one listener plus a FIFO
//! backlog of values emitted while no listener was attached. Attaching a
//! listener drains the backlog into it synchronously, in order, and from
//! then on values go straight to the listener. Slots are independent of
//! each other.
//!
//! Listeners run on the emitting task while the slot is locked, so a
//! listener must not attach a listener of its own kind.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::error::UploadError;

/// Callback attached to one signal kind.
pub type Listener<T> = Box<dyn FnMut(T) + Send>;

/// The signal kinds an upload emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Progress,
    Error,
    Done,
    Cancel,
    Pause,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Progress => "progress",
            SignalKind::Error => "error",
            SignalKind::Done => "done",
            SignalKind::Cancel => "cancel",
            SignalKind::Pause => "pause",
        };
        f.write_str(name)
    }
}

struct Slot<T> {
    listener: Option<Listener<T>>,
    backlog: VecDeque<T>,
}

/// One signal kind: an optional listener and its pending backlog.
pub struct EventSlot<T> {
    kind: SignalKind,
    inner: Mutex<Slot<T>>,
}

impl<T> EventSlot<T> {
    pub(crate) fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            inner: Mutex::new(Slot {
                listener: None,
                backlog: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Delivers `value` to the listener, or queues it if there is none.
    pub(crate) fn emit(&self, value: T) {
        let mut guard = self.lock();
        let slot = &mut *guard;
        match slot.listener.as_mut() {
            Some(listener) => listener(value),
            None => {
                slot.backlog.push_back(value);
                trace!(kind = %self.kind, pending = slot.backlog.len(), "signal buffered");
            }
        }
    }

    /// Replaces the listener after replaying the backlog into the new one.
    pub(crate) fn attach(&self, mut listener: Listener<T>) {
        let mut slot = self.lock();
        let replayed = slot.backlog.len();
        while let Some(value) = slot.backlog.pop_front() {
            listener(value);
        }
        slot.listener = Some(listener);
        if replayed > 0 {
            trace!(kind = %self.kind, replayed, "signal backlog replayed");
        }
    }

    /// Number of values waiting for a listener.
    pub fn pending(&self) -> usize {
        self.lock().backlog.len()
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }
}

/// Registry of all signal slots of one upload.
///
/// Only [`UploadState`](crate::UploadState) emits into it; callers observe
/// through listeners and [`Events::pending`].
///
/// ```compile_fail
/// fn forge(events: &resumio_upload::events::Events) {
///     events.progress.emit(3);
/// }
/// ```
pub struct Events {
    pub(crate) progress: EventSlot<u64>,
    pub(crate) error: EventSlot<Arc<UploadError>>,
    pub(crate) done: EventSlot<Option<serde_json::Value>>,
    pub(crate) cancel: EventSlot<()>,
    pub(crate) pause: EventSlot<()>,
}

impl Default for Events {
    fn default() -> Self {
        Self {
            progress: EventSlot::new(SignalKind::Progress),
            error: EventSlot::new(SignalKind::Error),
            done: EventSlot::new(SignalKind::Done),
            cancel: EventSlot::new(SignalKind::Cancel),
            pause: EventSlot::new(SignalKind::Pause),
        }
    }
}

impl Events {
    /// Pending backlog length for `kind`.
    pub fn pending(&self, kind: SignalKind) -> usize {
        match kind {
            SignalKind::Progress => self.progress.pending(),
            SignalKind::Error => self.error.pending(),
            SignalKind::Done => self.done.pending(),
            SignalKind::Cancel => self.cancel.pending(),
            SignalKind::Pause => self.pause.pending(),
        }
    }
}
