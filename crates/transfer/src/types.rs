use bytes::Bytes;

/// A contiguous window `[offset, offset + len)` read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset within the source.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Bytes,
}

impl Chunk {
    pub fn new(offset: u64, data: Bytes) -> Self {
        Self { offset, data }
    }

    /// Size of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.len()
    }
}
