//! In-memory source.
//!
//! Serves bytes from a shared buffer. The buffer can be appended to while a
//! reader is tailing it, which makes it the source of choice for tests and
//! for feeding data that arrives over another channel.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::RwLock;

use super::traits::StreamSource;
use crate::error::SourceError;

/// A byte source backed by memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    data: RwLock<BytesMut>,
}

impl MemorySource {
    /// Create a source over the given bytes.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self {
            data: RwLock::new(BytesMut::from(data.as_ref())),
        }
    }

    /// Append bytes to the end of the source.
    pub async fn append(&self, bytes: impl AsRef<[u8]>) {
        self.data.write().await.extend_from_slice(bytes.as_ref());
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&str> for MemorySource {
    fn from(data: &str) -> Self {
        Self::new(data)
    }
}

#[async_trait]
impl StreamSource for MemorySource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        let data = self.data.read().await;
        let len = data.len() as u64;
        if offset >= len {
            return Ok(Bytes::new());
        }
        let start = offset as usize;
        let end = start.saturating_add(length).min(data.len());
        Ok(Bytes::copy_from_slice(&data[start..end]))
    }

    async fn size(&self) -> Result<u64, SourceError> {
        Ok(self.data.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_async<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_memory_source_ranges() {
        run_async(async {
            let source = MemorySource::from("abcdef");
            assert_eq!(source.size().await.unwrap(), 6);
            assert_eq!(&source.read_range(1, 3).await.unwrap()[..], b"bcd");
            assert_eq!(&source.read_range(4, 100).await.unwrap()[..], b"ef");
            assert!(source.read_range(6, 1).await.unwrap().is_empty());
            assert_eq!(&source.read_from(2).await.unwrap()[..], b"cdef");
        });
    }

    #[test]
    fn test_memory_source_append() {
        run_async(async {
            let source = MemorySource::default();
            assert_eq!(source.size().await.unwrap(), 0);
            source.append("1,a\n").await;
            source.append(b"2,b\n").await;
            assert_eq!(&source.read_from(0).await.unwrap()[..], b"1,a\n2,b\n");
        });
    }
}
