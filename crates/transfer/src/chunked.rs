use bytes::Bytes;
use resumio_protocol::Offset;
use tracing::trace;

use crate::source::ByteSource;
use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Reads a [`ByteSource`] in fixed-size windows, tracking its own cursor.
pub struct ChunkSource {
    source: Box<dyn ByteSource>,
    chunk_size: usize,
    cursor: u64,
}

impl ChunkSource {
    /// Wraps `source` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(source: impl ByteSource + 'static, chunk_size: usize) -> Self {
        Self::from_boxed(Box::new(source), chunk_size)
    }

    pub fn from_boxed(source: Box<dyn ByteSource>, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            source,
            chunk_size,
            cursor: 0,
        }
    }

    /// Reads the next chunk.
    ///
    /// - `Some(Offset::Resume)`: returns `None` without touching the source or
    ///   the cursor; the caller is expected to ask the service for the offset.
    /// - `Some(Offset::Known(n))`: reads from `n`.
    /// - `None`: reads from the tracked cursor.
    ///
    /// At the end of the source an empty chunk is returned, never `None`.
    /// On failure the cursor is left where it was, so the call can simply be
    /// repeated.
    pub async fn next(&mut self, at: Option<Offset>) -> Result<Option<Chunk>, TransferError> {
        let start = match at {
            Some(Offset::Resume) => return Ok(None),
            Some(Offset::Known(n)) => n,
            None => self.cursor,
        };

        let size = self.source.size();
        if start > size {
            return Err(TransferError::OutOfBounds {
                offset: start,
                size,
            });
        }

        let want = (size - start).min(self.chunk_size as u64) as usize;
        let data = if want == 0 {
            Bytes::new()
        } else {
            self.source.read_at(start, want).await?
        };

        self.cursor = start + data.len() as u64;
        trace!(offset = start, len = data.len(), cursor = self.cursor, "chunk read");
        Ok(Some(Chunk::new(start, data)))
    }

    /// Current read cursor.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Total source size in bytes.
    pub fn size(&self) -> u64 {
        self.source.size()
    }

    /// Bytes between the cursor and the end of the source.
    pub fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.cursor)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FileSource, MemorySource};
    use std::future::Future;
    use std::io::Write;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Fails the next read whenever `fail_next` is armed.
    struct FlakySource {
        inner: MemorySource,
        fail_next: Arc<AtomicBool>,
    }

    impl ByteSource for FlakySource {
        fn size(&self) -> u64 {
            self.inner.size()
        }

        fn read_at(
            &self,
            offset: u64,
            len: usize,
        ) -> Pin<Box<dyn Future<Output = std::io::Result<Bytes>> + Send + '_>> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Box::pin(async { Err(std::io::Error::other("disk gone")) });
            }
            self.inner.read_at(offset, len)
        }
    }

    #[tokio::test]
    async fn reads_all_from_cursor() {
        let mut src = ChunkSource::new(MemorySource::new(&b"AABBCCDDEE"[..]), 4);
        assert_eq!(src.size(), 10);
        assert_eq!(src.remaining(), 10);

        let c1 = src.next(None).await.unwrap().unwrap();
        assert_eq!(c1.offset, 0);
        assert_eq!(&c1.data[..], b"AABB");
        assert_eq!(src.remaining(), 6);

        let c2 = src.next(None).await.unwrap().unwrap();
        assert_eq!(c2.offset, 4);
        assert_eq!(&c2.data[..], b"CCDD");

        let c3 = src.next(None).await.unwrap().unwrap();
        assert_eq!(c3.offset, 8);
        assert_eq!(&c3.data[..], b"EE");

        // Past the last byte: empty chunk, still a chunk.
        let c4 = src.next(None).await.unwrap().unwrap();
        assert_eq!(c4.offset, 10);
        assert!(c4.is_empty());
    }

    #[tokio::test]
    async fn explicit_offset_moves_cursor() {
        let mut src = ChunkSource::new(MemorySource::new(&b"0123456789"[..]), 4);
        let c = src.next(Some(Offset::Known(6))).await.unwrap().unwrap();
        assert_eq!(c.offset, 6);
        assert_eq!(&c.data[..], b"6789");
        assert_eq!(src.cursor(), 10);

        // Going back is allowed (service may have persisted less than sent).
        let c = src.next(Some(Offset::Known(2))).await.unwrap().unwrap();
        assert_eq!(&c.data[..], b"2345");
        assert_eq!(src.cursor(), 6);
    }

    #[tokio::test]
    async fn resume_marker_reads_nothing() {
        let mut src = ChunkSource::new(MemorySource::new(&b"0123456789"[..]), 4);
        src.next(None).await.unwrap();
        assert!(src.next(Some(Offset::Resume)).await.unwrap().is_none());
        assert_eq!(src.cursor(), 4);
    }

    #[tokio::test]
    async fn offset_past_end_is_rejected() {
        let mut src = ChunkSource::new(MemorySource::new(&b"0123"[..]), 4);
        let err = src.next(Some(Offset::Known(5))).await.unwrap_err();
        assert!(matches!(err, TransferError::OutOfBounds { offset: 5, size: 4 }));
    }

    #[tokio::test]
    async fn empty_source_yields_one_empty_chunk() {
        let mut src = ChunkSource::new(MemorySource::new(Bytes::new()), 4);
        let c = src.next(Some(Offset::Known(0))).await.unwrap().unwrap();
        assert_eq!(c.offset, 0);
        assert!(c.is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_cursor() {
        let fail_next = Arc::new(AtomicBool::new(false));
        let flaky = FlakySource {
            inner: MemorySource::new(&b"0123456789"[..]),
            fail_next: Arc::clone(&fail_next),
        };
        let mut src = ChunkSource::new(flaky, 4);
        src.next(None).await.unwrap();
        assert_eq!(src.cursor(), 4);

        fail_next.store(true, Ordering::SeqCst);
        let err = src.next(None).await.unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));
        assert_eq!(src.cursor(), 4);

        let c = src.next(None).await.unwrap().unwrap();
        assert_eq!(c.offset, 4);
        assert_eq!(&c.data[..], b"4567");
        assert_eq!(src.cursor(), 8);
    }

    #[tokio::test]
    async fn default_chunk_size_when_zero() {
        let src = ChunkSource::new(MemorySource::new(&b"x"[..]), 0);
        assert_eq!(src.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn reads_file_in_windows() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let original = b"The quick brown fox jumps over the lazy dog";
        tmp.write_all(original).unwrap();
        tmp.flush().unwrap();

        let file = FileSource::open(tmp.path()).await.unwrap();
        let mut src = ChunkSource::new(file, 10);
        let mut out = Vec::new();
        loop {
            let chunk = src.next(None).await.unwrap().unwrap();
            if chunk.is_empty() {
                break;
            }
            assert!(chunk.len() <= 10);
            out.extend_from_slice(&chunk.data);
        }
        assert_eq!(&out, original);
    }
}
