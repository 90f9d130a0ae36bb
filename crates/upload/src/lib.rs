//! Resumable chunked upload engine.
//!
//! This crate implements the **control logic** of a resumable upload: it
//! negotiates a session, pushes chunks strictly in order, and survives
//! network failures, pause/resume and cancellation without duplicating or
//! skipping byte ranges. Storage and HTTP sit behind the
//! [`ByteSource`](resumio_transfer::ByteSource) and
//! [`HttpClient`](resumio_transport::HttpClient) traits.
//!
//! # Lifecycle
//!
//! 1. **Negotiate**: `POST` the object name, receive a session URI
//! 2. **Transfer**: `PUT` chunks; a 308 tells how far the service got
//! 3. **Recover**: on any failure, report it and probe with `bytes */total`
//! 4. **Finish**: a 200/201 marks the upload done; `cancel()` stops it
//!
//! Observers attach one listener per signal kind on [`Upload`]; signals
//! emitted before a listener exists are buffered and replayed on attach.

pub mod backoff;
pub mod config;
pub mod error;
pub mod events;
pub mod state;
mod transfer_loop;
pub mod upload;

// Re-export primary types for convenience.
pub use backoff::RetryConfig;
pub use config::UploaderConfig;
pub use error::UploadError;
pub use events::SignalKind;
pub use state::{Finished, UploadState, UploadStatus};
pub use upload::{Upload, Uploader};

pub use resumio_protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_KEY, Offset};
pub use resumio_transfer::{ByteSource, FileSource, MemorySource};
