//! Transport error types.

use resumio_protocol::ProtocolError;

/// Errors from a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// Returns `true` for errors caused by a malformed service response.
    pub fn is_protocol(&self) -> bool {
        matches!(self, TransportError::Protocol(_))
    }
}

/// Errors from session negotiation. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("negotiation failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed negotiation response: {0}")]
    MalformedBody(#[source] ProtocolError),

    #[error("negotiation request failed: {0}")]
    Request(#[source] TransportError),
}
