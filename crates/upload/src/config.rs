//! Uploader configuration.

use std::time::Duration;

use resumio_protocol::constants::CHUNK_GRANULARITY;
use resumio_protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_KEY};
use tracing::warn;

use crate::backoff::RetryConfig;
use crate::error::UploadError;

/// Settings shared by every upload started from one [`Uploader`](crate::Uploader).
#[derive(Debug, Clone, PartialEq)]
pub struct UploaderConfig {
    /// URL the session negotiation POST goes to.
    pub session_endpoint: String,
    /// JSON key carrying the object name in the negotiation body.
    pub file_key: String,
    /// Bytes per chunk PUT.
    pub chunk_size: usize,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    pub retry: RetryConfig,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            session_endpoint: String::new(),
            file_key: DEFAULT_FILE_KEY.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: None,
            retry: RetryConfig::default(),
        }
    }
}

impl UploaderConfig {
    /// Default configuration for `endpoint`.
    pub fn new(session_endpoint: impl Into<String>) -> Self {
        Self {
            session_endpoint: session_endpoint.into(),
            ..Self::default()
        }
    }

    /// Checks the configuration before any upload is started.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.session_endpoint.trim().is_empty() {
            return Err(UploadError::Config("session endpoint is empty".into()));
        }
        if self.file_key.is_empty() {
            return Err(UploadError::Config("file key is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::Config("chunk size must be positive".into()));
        }
        if !self.retry.initial_delay.is_zero() && self.retry.backoff_factor < 1.0 {
            return Err(UploadError::Config(format!(
                "backoff factor {} would shrink delays",
                self.retry.backoff_factor
            )));
        }
        if self.chunk_size % CHUNK_GRANULARITY != 0 {
            warn!(
                chunk_size = self.chunk_size,
                granularity = CHUNK_GRANULARITY,
                "chunk size is not a multiple of the usual upload granularity"
            );
        }
        Ok(())
    }
}
