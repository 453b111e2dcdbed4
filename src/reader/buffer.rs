//! Fetch buffer for one partition.
//!
//! Holds the bytes between the current record start and the end of the last
//! fetch. Consumed bytes are released from the front; `BytesMut` reclaims
//! that space on the next reservation, so memory stays proportional to the
//! largest record rather than to the partition.

use bytes::{Buf, BytesMut};

use crate::error::SourceError;
use crate::source::StreamSource;

/// Sliding window over a source, addressed by absolute offsets.
#[derive(Debug)]
pub struct FetchBuffer {
    data: BytesMut,
    /// Absolute offset of `data[0]`.
    offset: u64,
}

impl FetchBuffer {
    /// Create an empty buffer positioned at `offset`.
    pub fn new(offset: u64) -> Self {
        Self {
            data: BytesMut::new(),
            offset,
        }
    }

    /// Buffered bytes, starting at [`offset`](Self::offset).
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Absolute offset of the first buffered byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset of the next byte to fetch.
    pub fn fetch_offset(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// Drop `n` bytes from the front.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.advance(n);
        self.offset += n as u64;
    }

    /// Append up to `length` bytes read from `source`.
    ///
    /// Returns the number of bytes added; zero means the source currently
    /// has nothing past the buffered range.
    pub async fn fill(
        &mut self,
        source: &dyn StreamSource,
        length: usize,
    ) -> Result<usize, SourceError> {
        let bytes = source.read_range(self.fetch_offset(), length).await?;
        self.data.extend_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Free the buffered bytes.
    pub fn release(&mut self) {
        self.offset = self.fetch_offset();
        self.data = BytesMut::new();
    }
}
