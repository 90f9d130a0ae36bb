//! Wire vocabulary for the resumable upload protocol.
//!
//! Everything here is pure data: offsets, `Content-Range` formatting,
//! `Range` response parsing and the session negotiation messages. No I/O.

pub mod constants;
pub mod messages;
pub mod offset;
pub mod range;

pub use constants::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_KEY};
pub use messages::{SessionRequest, SessionResponse};
pub use offset::Offset;
pub use range::{ContentRange, parse_range_header};

/// Errors produced while decoding protocol data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid Range header: {0}")]
    InvalidRangeHeader(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
