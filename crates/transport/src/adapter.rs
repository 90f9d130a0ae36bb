//! Protocol-level operations on top of an [`HttpClient`].

use std::fmt;
use std::sync::Arc;

use resumio_protocol::constants::{
    HEADER_CONTENT_LENGTH, HEADER_CONTENT_RANGE, HEADER_CONTENT_TYPE, HEADER_RANGE,
    STATUS_RESUME_INCOMPLETE, is_final_status,
};
use resumio_protocol::{ContentRange, ProtocolError, SessionRequest, SessionResponse};
use resumio_transfer::Chunk;
use tracing::{debug, info};

use crate::error::{SessionError, TransportError};
use crate::http::{HttpClient, HttpRequest, Method};

/// Opaque handle of one resumable upload session (the session URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a chunk PUT told us about the session.
#[derive(Debug)]
pub enum PutOutcome {
    /// The object is complete. Carries the response body when it is JSON.
    Completed(Option<serde_json::Value>),
    /// The service persisted `[0, next_offset)`; continue from `next_offset`.
    Partial { next_offset: u64 },
    /// State unknown (network failure or unexpected status). The caller
    /// should report `cause` and probe for the real offset.
    Unknown(TransportError),
}

/// Speaks the resumable upload protocol over an [`HttpClient`].
#[derive(Clone)]
pub struct TransportAdapter {
    client: Arc<dyn HttpClient>,
    endpoint: String,
    file_key: String,
}

impl TransportAdapter {
    /// `endpoint` is the negotiation URL; `file_key` the JSON key carrying the
    /// object name in the negotiation body.
    pub fn new(
        client: Arc<dyn HttpClient>,
        endpoint: impl Into<String>,
        file_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            file_key: file_key.into(),
        }
    }

    /// Asks the service for a new upload session for `name`.
    pub async fn negotiate_session(&self, name: &str) -> Result<SessionHandle, SessionError> {
        let body = SessionRequest::new(self.file_key.as_str(), name)
            .to_json()
            .map_err(SessionError::MalformedBody)?;
        let req = HttpRequest::new(Method::Post, self.endpoint.as_str())
            .header(HEADER_CONTENT_TYPE, "application/json")
            .body(body);

        let resp = self.client.send(req).await.map_err(SessionError::Request)?;
        if !is_final_status(resp.status) {
            return Err(SessionError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }

        let session = SessionResponse::from_slice(&resp.body).map_err(SessionError::MalformedBody)?;
        info!(name, session = %session.data, "upload session negotiated");
        Ok(SessionHandle::new(session.data))
    }

    /// Sends one chunk, or a probe when `chunk` is `None`.
    ///
    /// Probes carry no body and no content headers, only the `bytes */total`
    /// range. Network failures and unexpected statuses are returned as
    /// [`PutOutcome::Unknown`]; only a malformed 308 is an `Err`.
    pub async fn put_chunk(
        &self,
        session: &SessionHandle,
        chunk: Option<&Chunk>,
        content_type: &str,
        range: ContentRange,
    ) -> Result<PutOutcome, TransportError> {
        let mut req = HttpRequest::new(Method::Put, session.uri())
            .header(HEADER_CONTENT_RANGE, range.to_string());
        if let Some(chunk) = chunk {
            req = req
                .header(HEADER_CONTENT_LENGTH, chunk.len().to_string())
                .header(HEADER_CONTENT_TYPE, content_type)
                .body(chunk.data.clone());
        }

        debug!(
            session = %session,
            range = %range,
            probe = chunk.is_none(),
            "sending chunk"
        );

        let resp = match self.client.send(req).await {
            Ok(resp) => resp,
            Err(e) => return Ok(PutOutcome::Unknown(e)),
        };

        if is_final_status(resp.status) {
            let metadata = if resp.body.is_empty() {
                None
            } else {
                serde_json::from_slice(&resp.body).ok()
            };
            return Ok(PutOutcome::Completed(metadata));
        }

        if resp.status == STATUS_RESUME_INCOMPLETE {
            let header = resp.header(HEADER_RANGE).ok_or_else(|| {
                ProtocolError::InvalidRangeHeader("missing from 308 response".into())
            })?;
            let last_byte = resumio_protocol::parse_range_header(header)?;
            let next_offset = last_byte.checked_add(1).ok_or_else(|| {
                ProtocolError::InvalidRangeHeader(format!("{header}: last byte out of range"))
            })?;
            return Ok(PutOutcome::Partial { next_offset });
        }

        Ok(PutOutcome::Unknown(TransportError::UnexpectedStatus(
            resp.status,
        )))
    }
}
