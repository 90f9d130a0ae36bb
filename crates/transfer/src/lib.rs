//! Chunked reads over file-like sources with resume support.

mod chunked;
mod source;
mod types;

pub use chunked::ChunkSource;
pub use source::{ByteSource, FileSource, MemorySource};
pub use types::Chunk;

pub use resumio_protocol::DEFAULT_CHUNK_SIZE;

/// Errors produced while reading chunks from a source.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("offset {offset} is past the end of the source ({size} bytes)")]
    OutOfBounds { offset: u64, size: u64 },
}
