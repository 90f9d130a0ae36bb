//! Upload status and the signals that report its changes.
//!
//! [`UploadState`] owns the flags the status is derived from and is the
//! only place that emits signals. Every mutator emits at most once per
//! logical event.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use resumio_protocol::Offset;
use resumio_transport::SessionHandle;
use tokio::sync::{Notify, watch};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::events::Events;

/// Derived status of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    InProgress,
    Paused,
    Cancelled,
    Done,
}

impl UploadStatus {
    /// Done and Cancelled are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Done | UploadStatus::Cancelled)
    }
}

/// How an upload task ended: its terminal status, or the error that kept
/// it from starting.
pub type Finished = Result<UploadStatus, Arc<UploadError>>;

struct Flags {
    done: bool,
    cancelled: bool,
    paused: bool,
    /// Set by `resume()`, consumed by the transfer loop at its next boundary.
    resync: bool,
    last_offset: Offset,
    last_error: Option<Arc<UploadError>>,
    /// Highest offset emitted as progress.
    reported: u64,
}

impl Flags {
    fn status(&self) -> UploadStatus {
        if self.done {
            UploadStatus::Done
        } else if self.cancelled {
            UploadStatus::Cancelled
        } else if self.paused {
            UploadStatus::Paused
        } else {
            UploadStatus::InProgress
        }
    }
}

/// Shared state of one upload (thread-safe).
pub struct UploadState {
    size: u64,
    content_type: String,
    session: OnceLock<SessionHandle>,
    flags: Mutex<Flags>,
    events: Events,
    wake: Notify,
    cancel: CancellationToken,
    finished: watch::Sender<Option<Finished>>,
}

impl UploadState {
    /// Creates the state of a fresh upload of `size` bytes.
    pub fn new(size: u64, content_type: impl Into<String>) -> Self {
        Self {
            size,
            content_type: content_type.into(),
            session: OnceLock::new(),
            flags: Mutex::new(Flags {
                done: false,
                cancelled: false,
                paused: false,
                resync: false,
                last_offset: Offset::Known(0),
                last_error: None,
                reported: 0,
            }),
            events: Events::default(),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
            finished: watch::Sender::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total bytes to upload.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The negotiated session, once there is one.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.get()
    }

    pub(crate) fn set_session(&self, session: SessionHandle) {
        if self.session.set(session).is_err() {
            warn!("session handle already set, keeping the first one");
        }
    }

    /// Current status: Done > Cancelled > Paused > InProgress.
    pub fn status(&self) -> UploadStatus {
        self.lock().status()
    }

    /// Last offset acknowledged by the service, or [`Offset::Resume`] after
    /// a failure left it unknown.
    pub fn last_offset(&self) -> Offset {
        self.lock().last_offset
    }

    pub(crate) fn set_last_offset(&self, offset: Offset) {
        self.lock().last_offset = offset;
    }

    /// Most recent error. Does not affect the status.
    pub fn last_error(&self) -> Option<Arc<UploadError>> {
        self.lock().last_error.clone()
    }

    /// The signal registry.
    pub fn events(&self) -> &Events {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Emits `progress(n)` for `Offset::Known(n)`.
    ///
    /// Ignored for the resume marker, for 0, and for any offset not beyond
    /// the last one reported, so observers see a strictly increasing
    /// sequence.
    pub(crate) fn report_progress(&self, offset: Offset) {
        let Offset::Known(n) = offset else {
            return;
        };
        if n == 0 {
            return;
        }
        {
            let mut flags = self.lock();
            if n <= flags.reported {
                return;
            }
            flags.reported = n;
        }
        debug!(offset = n, size = self.size, "progress");
        self.events.progress.emit(n);
    }

    /// Records `err` and emits `error(err)`.
    pub(crate) fn report_error(&self, err: UploadError) -> Arc<UploadError> {
        let err = Arc::new(err);
        self.lock().last_error = Some(Arc::clone(&err));
        warn!(error = %err, "upload error");
        self.events.error.emit(Arc::clone(&err));
        err
    }

    /// Marks the upload done and emits `done(metadata)`.
    ///
    /// Returns `false` (and emits nothing) if already done or cancelled.
    pub(crate) fn mark_done(&self, metadata: Option<serde_json::Value>) -> bool {
        {
            let mut flags = self.lock();
            if flags.done || flags.cancelled {
                return false;
            }
            flags.done = true;
            flags.last_offset = Offset::Known(self.size);
        }
        info!(size = self.size, "upload done");
        self.wake.notify_one();
        self.events.done.emit(metadata);
        true
    }

    /// Cancels the upload and emits `cancel`.
    ///
    /// In-flight requests are not aborted; their results are discarded.
    /// Returns `false` if the upload is already terminal.
    pub fn cancel(&self) -> bool {
        {
            let mut flags = self.lock();
            if flags.status().is_terminal() {
                return false;
            }
            flags.cancelled = true;
        }
        info!("upload cancelled");
        self.cancel.cancel();
        self.wake.notify_one();
        self.events.cancel.emit(());
        true
    }

    /// Pauses the upload. Emits `pause` only on the transition into paused.
    pub fn pause(&self) -> bool {
        {
            let mut flags = self.lock();
            if flags.paused || flags.status().is_terminal() {
                return false;
            }
            flags.paused = true;
        }
        info!("upload paused");
        self.wake.notify_one();
        self.events.pause.emit(());
        true
    }

    /// Resumes a paused upload. The next request is a probe so the service
    /// can tell which bytes it actually kept. Emits nothing.
    pub fn resume(&self) -> bool {
        {
            let mut flags = self.lock();
            if !flags.paused || flags.status().is_terminal() {
                return false;
            }
            flags.paused = false;
            flags.resync = true;
        }
        info!("upload resumed");
        self.wake.notify_one();
        true
    }

    // -----------------------------------------------------------------------
    // Listener registration
    // -----------------------------------------------------------------------

    pub fn on_progress(&self, listener: impl FnMut(u64) + Send + 'static) {
        self.events.progress.attach(Box::new(listener));
    }

    pub fn on_error(&self, listener: impl FnMut(Arc<UploadError>) + Send + 'static) {
        self.events.error.attach(Box::new(listener));
    }

    pub fn on_done(&self, listener: impl FnMut(Option<serde_json::Value>) + Send + 'static) {
        self.events.done.attach(Box::new(listener));
    }

    pub fn on_cancel(&self, mut listener: impl FnMut() + Send + 'static) {
        self.events.cancel.attach(Box::new(move |()| listener()));
    }

    pub fn on_pause(&self, mut listener: impl FnMut() + Send + 'static) {
        self.events.pause.attach(Box::new(move |()| listener()));
    }

    // -----------------------------------------------------------------------
    // Transfer loop plumbing
    // -----------------------------------------------------------------------

    /// Waits until the loop may issue its next request.
    ///
    /// Returns `None` once the upload is terminal, otherwise whether a
    /// resume asked for re-synchronisation since the last call.
    pub(crate) async fn wait_until_runnable(&self) -> Option<bool> {
        loop {
            let status = {
                let mut flags = self.lock();
                match flags.status() {
                    UploadStatus::InProgress => return Some(std::mem::take(&mut flags.resync)),
                    status => status,
                }
            };
            if status.is_terminal() {
                return None;
            }
            debug!("transfer loop parked while paused");
            self.wake.notified().await;
        }
    }

    /// Resolves once `cancel()` has been called.
    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Publishes how the upload ended. The first result wins.
    pub(crate) fn finish(&self, result: Finished) {
        self.finished.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
            true
        });
    }

    /// Waits for the upload task to end.
    pub async fn wait(&self) -> Finished {
        let mut rx = self.finished.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(finished) => finished.clone().unwrap_or(Ok(self.status())),
            Err(_) => Ok(self.status()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v| sink.lock().unwrap().push(v))
    }

    fn counter() -> (Arc<Mutex<usize>>, impl FnMut() + Send + 'static) {
        let n = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&n);
        (n, move || *sink.lock().unwrap() += 1)
    }

    #[test]
    fn new_upload_is_in_progress() {
        let state = UploadState::new(100, "application/octet-stream");
        assert_eq!(state.status(), UploadStatus::InProgress);
        assert_eq!(state.size(), 100);
        assert_eq!(state.content_type(), "application/octet-stream");
        assert_eq!(state.last_offset(), Offset::Known(0));
        assert!(state.last_error().is_none());
        assert!(state.session().is_none());
    }

    #[test]
    fn progress_replayed_to_late_listener() {
        let state = UploadState::new(100, "x");
        state.report_progress(Offset::Known(10));
        state.report_progress(Offset::Known(20));
        state.report_progress(Offset::Known(30));

        let (first, listener) = recorder();
        state.on_progress(listener);
        assert_eq!(*first.lock().unwrap(), vec![10, 20, 30]);

        let (second, listener) = recorder();
        state.on_progress(listener);
        assert!(second.lock().unwrap().is_empty());
    }

    #[test]
    fn progress_ignores_marker_zero_and_repeats() {
        let state = UploadState::new(100, "x");
        let (seen, listener) = recorder();
        state.on_progress(listener);

        state.report_progress(Offset::Resume);
        state.report_progress(Offset::Known(0));
        state.report_progress(Offset::Known(8));
        state.report_progress(Offset::Known(8));
        state.report_progress(Offset::Known(4));
        state.report_progress(Offset::Known(16));

        assert_eq!(*seen.lock().unwrap(), vec![8, 16]);
    }

    #[test]
    fn error_recorded_without_status_change() {
        let state = UploadState::new(10, "x");
        let (seen, listener) = recorder();
        state.on_error(listener);

        state.report_error(UploadError::Config("boom".into()));
        assert_eq!(state.status(), UploadStatus::InProgress);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(state.last_error().unwrap().to_string().contains("boom"));
    }

    #[test]
    fn done_is_idempotent_and_final() {
        let state = UploadState::new(10, "x");
        let (done, on_done) = recorder();
        let (cancels, on_cancel) = counter();
        state.on_done(on_done);
        state.on_cancel(on_cancel);

        assert!(state.mark_done(None));
        assert!(!state.mark_done(None));
        assert_eq!(done.lock().unwrap().len(), 1);
        assert_eq!(state.last_offset(), Offset::Known(10));

        assert!(!state.cancel());
        assert!(!state.pause());
        assert!(!state.resume());
        assert_eq!(state.status(), UploadStatus::Done);
        assert_eq!(*cancels.lock().unwrap(), 0);
    }

    #[test]
    fn pause_emits_only_on_transition() {
        let state = UploadState::new(10, "x");
        let (pauses, on_pause) = counter();
        state.on_pause(on_pause);

        assert!(state.pause());
        assert!(!state.pause());
        assert_eq!(state.status(), UploadStatus::Paused);
        assert_eq!(*pauses.lock().unwrap(), 1);

        assert!(state.resume());
        assert!(!state.resume());
        assert_eq!(state.status(), UploadStatus::InProgress);

        assert!(state.pause());
        assert_eq!(*pauses.lock().unwrap(), 2);
    }

    #[test]
    fn cancel_wins_over_pause() {
        let state = UploadState::new(10, "x");
        state.pause();
        assert!(state.cancel());
        assert_eq!(state.status(), UploadStatus::Cancelled);
        assert!(!state.resume());
        assert!(!state.mark_done(None));
        assert_eq!(state.status(), UploadStatus::Cancelled);
        assert_eq!(state.events().pending(crate::SignalKind::Cancel), 1);
    }

    #[tokio::test]
    async fn runnable_consumes_resync_once() {
        let state = UploadState::new(10, "x");
        assert_eq!(state.wait_until_runnable().await, Some(false));

        state.pause();
        state.resume();
        assert_eq!(state.wait_until_runnable().await, Some(true));
        assert_eq!(state.wait_until_runnable().await, Some(false));
    }

    #[tokio::test]
    async fn paused_loop_wakes_on_resume_and_cancel() {
        let state = Arc::new(UploadState::new(10, "x"));
        state.pause();

        let waiter = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.wait_until_runnable().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        state.resume();
        assert_eq!(waiter.await.unwrap(), Some(true));

        state.pause();
        let waiter = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.wait_until_runnable().await }
        });
        tokio::task::yield_now().await;
        state.cancel();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn wait_returns_finished_result() {
        let state = Arc::new(UploadState::new(10, "x"));
        let waiter = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.wait().await }
        });
        state.finish(Ok(UploadStatus::Done));
        assert_eq!(waiter.await.unwrap().unwrap(), UploadStatus::Done);
        // Later waiters see the same result.
        assert_eq!(state.wait().await.unwrap(), UploadStatus::Done);
    }

    #[tokio::test]
    async fn first_finish_wins() {
        let state = UploadState::new(10, "x");
        state.finish(Ok(UploadStatus::Cancelled));
        state.finish(Err(Arc::new(UploadError::Aborted("late".into()))));
        assert_eq!(state.wait().await.unwrap(), UploadStatus::Cancelled);
    }
}
