//! StreamSource trait definition
//!
//! Provides a unified async interface for reading bytes from a resolved file.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// Abstraction over byte sources with async range-request support.
///
/// Readers never hold the whole file: every partition fetches the byte
/// ranges it needs through this trait. A source may grow between calls
/// (a file being appended to); `size()` reports the length currently
/// readable.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Read up to `length` bytes starting at `offset`.
    ///
    /// Returns fewer bytes near the end of the source and an empty buffer
    /// at or past the end, so a tailing reader can poll without erroring.
    ///
    /// # Errors
    /// Returns `SourceError` if the source is not accessible or an I/O
    /// error occurs.
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError>;

    /// Number of bytes currently readable.
    async fn size(&self) -> Result<u64, SourceError>;

    /// Read all bytes from `offset` to the current end of the source.
    async fn read_from(&self, offset: u64) -> Result<Bytes, SourceError> {
        let size = self.size().await?;
        if offset >= size {
            return Ok(Bytes::new());
        }
        self.read_range(offset, (size - offset) as usize).await
    }
}

/// A boxed StreamSource for dynamic dispatch
pub type BoxedSource = Box<dyn StreamSource>;

/// A StreamSource shared between the partitions of one read.
pub type SharedSource = Arc<dyn StreamSource>;

/// Implement StreamSource for BoxedSource to allow using it with generic code
#[async_trait]
impl StreamSource for BoxedSource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        (**self).read_range(offset, length).await
    }

    async fn size(&self) -> Result<u64, SourceError> {
        (**self).size().await
    }

    async fn read_from(&self, offset: u64) -> Result<Bytes, SourceError> {
        (**self).read_from(offset).await
    }
}
