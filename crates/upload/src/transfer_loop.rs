//! The sequential chunk pump behind every [`Upload`](crate::Upload).

use std::sync::Arc;

use resumio_protocol::{ContentRange, Offset, ProtocolError};
use resumio_transfer::ChunkSource;
use resumio_transport::{PutOutcome, SessionHandle, TransportAdapter};
use tracing::{debug, info, warn};

use crate::backoff::RetryConfig;
use crate::error::UploadError;
use crate::state::{UploadState, UploadStatus};

/// Drives one session from its first chunk to a terminal status.
///
/// At most one read and one request are outstanding at any time.
pub(crate) struct TransferLoop {
    state: Arc<UploadState>,
    source: ChunkSource,
    transport: TransportAdapter,
    session: SessionHandle,
    retry: RetryConfig,
}

enum Step {
    Outcome(PutOutcome),
    Failed(UploadError),
}

impl TransferLoop {
    pub(crate) fn new(
        state: Arc<UploadState>,
        source: ChunkSource,
        transport: TransportAdapter,
        session: SessionHandle,
        retry: RetryConfig,
    ) -> Self {
        Self {
            state,
            source,
            transport,
            session,
            retry,
        }
    }

    /// Runs until the upload is done or cancelled. Returns the final status.
    pub(crate) async fn run(mut self) -> UploadStatus {
        let total = self.state.size();
        let mut next = Offset::Known(0);
        let mut sent_any = false;
        let mut failures: u32 = 0;

        info!(session = %self.session, size = total, "transfer started");

        loop {
            let Some(resync) = self.state.wait_until_runnable().await else {
                break;
            };
            if resync && sent_any {
                debug!(session = %self.session, "resuming with a probe");
                next = Offset::Resume;
            }

            let step = self.step(next, total).await;
            sent_any = true;

            if self.state.status() == UploadStatus::Cancelled {
                debug!(session = %self.session, "discarding result after cancel");
                break;
            }

            let err = match step {
                Step::Outcome(PutOutcome::Completed(metadata)) => {
                    self.state.set_last_offset(Offset::Known(total));
                    self.state.mark_done(metadata);
                    break;
                }
                Step::Outcome(PutOutcome::Partial { next_offset }) if next_offset > total => {
                    UploadError::Protocol(ProtocolError::InvalidRangeHeader(format!(
                        "acknowledged offset {next_offset} beyond size {total}"
                    )))
                }
                Step::Outcome(PutOutcome::Partial { next_offset }) => {
                    failures = 0;
                    let offset = Offset::Known(next_offset);
                    self.state.set_last_offset(offset);
                    self.state.report_progress(offset);
                    next = offset;
                    continue;
                }
                Step::Outcome(PutOutcome::Unknown(cause)) => UploadError::from(cause),
                Step::Failed(err) => err,
            };

            self.state.set_last_offset(Offset::Resume);
            self.state.report_error(err);
            next = Offset::Resume;
            failures = failures.saturating_add(1);

            let delay = self.retry.delay_for_attempt(failures);
            if !delay.is_zero() {
                debug!(attempt = failures, ?delay, "backing off before probe");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.state.cancelled() => break,
                }
            }
        }

        let status = self.state.status();
        info!(session = %self.session, ?status, "transfer finished");
        status
    }

    /// Reads the chunk at `at` (nothing for a probe) and sends it.
    async fn step(&mut self, at: Offset, total: u64) -> Step {
        let chunk = match self.source.next(Some(at)).await {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(offset = %at, error = %e, "chunk read failed");
                return Step::Failed(e.into());
            }
        };

        let range = match &chunk {
            Some(chunk) => ContentRange::for_window(chunk.offset, chunk.len(), total),
            None => ContentRange::Probe { total },
        };

        match self
            .transport
            .put_chunk(
                &self.session,
                chunk.as_ref(),
                self.state.content_type(),
                range,
            )
            .await
        {
            Ok(outcome) => Step::Outcome(outcome),
            Err(e) => Step::Failed(e.into()),
        }
    }
}
