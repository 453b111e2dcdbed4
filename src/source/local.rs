//! Local filesystem source implementation
//!
//! Provides async file I/O for reading CSV files from the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::Mutex;

use super::traits::StreamSource;
use crate::error::SourceError;

/// A data source for reading from local filesystem.
///
/// Uses tokio's async file I/O with seek + read for range requests. The
/// file size is looked up on every `size()` call, so a file that is still
/// being appended to can be tailed.
pub struct LocalSource {
    /// The file handle wrapped in a mutex for safe concurrent access
    file: Mutex<File>,
    /// Path to the file (for error reporting)
    path: PathBuf,
}

impl LocalSource {
    /// Open a local file for reading.
    ///
    /// # Errors
    /// Returns `SourceError::NotFound` if the file doesn't exist.
    /// Returns `SourceError::PermissionDenied` if access is denied.
    /// Returns `SourceError::FileSystemError` for other I/O errors.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(path.display().to_string())
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                SourceError::PermissionDenied(path.display().to_string())
            } else {
                SourceError::FileSystemError(format!("{}: {}", path.display(), e))
            }
        })?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Get the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StreamSource for LocalSource {
    async fn read_range(&self, offset: u64, length: usize) -> Result<Bytes, SourceError> {
        let mut file = self.file.lock().await;

        file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
            SourceError::FileSystemError(format!(
                "Failed to seek to offset {} in {}: {}",
                offset,
                self.path.display(),
                e
            ))
        })?;

        // A short read is the current end of the file, not an error.
        let mut buffer = Vec::with_capacity(length);
        (&mut *file)
            .take(length as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| {
                SourceError::FileSystemError(format!(
                    "Failed to read {} bytes at offset {} from {}: {}",
                    length,
                    offset,
                    self.path.display(),
                    e
                ))
            })?;

        Ok(Bytes::from(buffer))
    }

    async fn size(&self) -> Result<u64, SourceError> {
        let file = self.file.lock().await;
        let metadata = file.metadata().await.map_err(|e| {
            SourceError::FileSystemError(format!(
                "Failed to get metadata for {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(metadata.len())
    }
}

impl std::fmt::Debug for LocalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSource")
            .field("path", &self.path)
            .finish()
    }
}
