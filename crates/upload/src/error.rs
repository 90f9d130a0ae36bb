//! Upload error types.

use resumio_protocol::ProtocolError;
use resumio_transfer::TransferError;
use resumio_transport::{SessionError, TransportError};

/// Errors surfaced through the `error` signal.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("session negotiation failed: {0}")]
    Session(#[from] SessionError),

    #[error("transport error: {0}")]
    Transport(TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("read error: {0}")]
    Read(#[from] TransferError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("upload task aborted: {0}")]
    Aborted(String),
}

impl From<TransportError> for UploadError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Protocol(p) => UploadError::Protocol(p),
            other => UploadError::Transport(other),
        }
    }
}

impl UploadError {
    /// Returns `true` if the transfer loop retries after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            UploadError::Session(_) | UploadError::Config(_) | UploadError::Aborted(_)
        )
    }
}
