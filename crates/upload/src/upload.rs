//! Public entry points: [`Uploader`] starts uploads, [`Upload`] observes and
//! controls one of them.

use std::path::Path;
use std::sync::Arc;

use resumio_protocol::Offset;
use resumio_transfer::{ByteSource, ChunkSource, FileSource, TransferError};
use resumio_transport::{HttpClient, ReqwestClient, SessionHandle, TransportAdapter};
use tracing::{debug, error, info};

use crate::backoff::RetryConfig;
use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::state::{Finished, UploadState, UploadStatus};
use crate::transfer_loop::TransferLoop;

/// Starts uploads against one negotiation endpoint.
pub struct Uploader {
    transport: TransportAdapter,
    config: UploaderConfig,
}

impl Uploader {
    /// Creates an uploader backed by `reqwest`.
    pub fn new(config: UploaderConfig) -> Result<Self, UploadError> {
        let client = ReqwestClient::new(config.request_timeout)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Creates an uploader over any [`HttpClient`].
    pub fn with_client(
        config: UploaderConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        let transport = TransportAdapter::new(
            client,
            config.session_endpoint.as_str(),
            config.file_key.as_str(),
        );
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Starts uploading `source` as `name`.
    ///
    /// The upload runs on a spawned tokio task, so this must be called from
    /// within a runtime. Listeners can be attached to the returned handle at
    /// any time; signals emitted before that are replayed.
    pub fn upload(
        &self,
        name: &str,
        content_type: &str,
        source: impl ByteSource + 'static,
    ) -> Upload {
        let state = Arc::new(UploadState::new(source.size(), content_type));
        let chunks = ChunkSource::new(source, self.config.chunk_size);

        debug!(name, size = state.size(), "starting upload");
        let task = tokio::spawn(run_upload(
            Arc::clone(&state),
            self.transport.clone(),
            chunks,
            self.config.retry.clone(),
            name.to_string(),
        ));

        // A panicking listener unwinds the upload task before it can publish
        // its result; waiters still need one.
        let watched = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(error = %e, "upload task aborted");
                watched.finish(Err(Arc::new(UploadError::Aborted(e.to_string()))));
            }
        });

        Upload { state }
    }

    /// Opens `path` and uploads it under its file name.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> Result<Upload, UploadError> {
        let path = path.as_ref();
        let source = FileSource::open(path).await.map_err(TransferError::from)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.upload(&name, content_type, source))
    }
}

async fn run_upload(
    state: Arc<UploadState>,
    transport: TransportAdapter,
    chunks: ChunkSource,
    retry: RetryConfig,
    name: String,
) {
    let session = match transport.negotiate_session(&name).await {
        Ok(session) => session,
        Err(e) => {
            let err = state.report_error(e.into());
            state.finish(Err(err));
            return;
        }
    };
    state.set_session(session.clone());

    let status = TransferLoop::new(Arc::clone(&state), chunks, transport, session, retry)
        .run()
        .await;
    info!(name, ?status, "upload task ended");
    state.finish(Ok(status));
}

/// Handle to one running upload. Cheap to clone.
#[derive(Clone)]
pub struct Upload {
    state: Arc<UploadState>,
}

impl Upload {
    pub fn size(&self) -> u64 {
        self.state.size()
    }

    pub fn content_type(&self) -> &str {
        self.state.content_type()
    }

    pub fn status(&self) -> UploadStatus {
        self.state.status()
    }

    /// Session URI, once negotiated.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.state.session()
    }

    pub fn last_offset(&self) -> Offset {
        self.state.last_offset()
    }

    pub fn last_error(&self) -> Option<Arc<UploadError>> {
        self.state.last_error()
    }

    pub fn on_progress(&self, listener: impl FnMut(u64) + Send + 'static) {
        self.state.on_progress(listener);
    }

    pub fn on_error(&self, listener: impl FnMut(Arc<UploadError>) + Send + 'static) {
        self.state.on_error(listener);
    }

    pub fn on_done(&self, listener: impl FnMut(Option<serde_json::Value>) + Send + 'static) {
        self.state.on_done(listener);
    }

    pub fn on_cancel(&self, listener: impl FnMut() + Send + 'static) {
        self.state.on_cancel(listener);
    }

    pub fn on_pause(&self, listener: impl FnMut() + Send + 'static) {
        self.state.on_pause(listener);
    }

    /// See [`UploadState::cancel`].
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// See [`UploadState::pause`].
    pub fn pause(&self) -> bool {
        self.state.pause()
    }

    /// See [`UploadState::resume`].
    pub fn resume(&self) -> bool {
        self.state.resume()
    }

    /// Waits until the upload is done, cancelled, or failed to start.
    pub async fn wait(&self) -> Finished {
        self.state.wait().await
    }
}
