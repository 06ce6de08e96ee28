//! Positional writes to the local file.
//!
//! Chunks complete in arbitrary order, so each write seeks to the chunk's
//! byte offset before writing. Every helper opens its own handle; workers
//! never share a file descriptor, so no cross-task seek coordination is
//! needed.

use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};

use super::error::DownloadError;

/// Ensures the local file exists without disturbing existing content.
pub(crate) async fn create_local_file(path: &Path) -> Result<(), DownloadError> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    Ok(())
}

/// Returns the local file's length in bytes, or 0 if it does not exist.
pub(crate) async fn local_file_size(path: &Path) -> Result<u64, DownloadError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}

/// Writes `data` at byte offset `offset`, extending the file if needed.
pub(crate) async fn write_at(path: &Path, offset: u64, data: &[u8]) -> Result<(), DownloadError> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.write_all(data)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.flush().await.map_err(|e| DownloadError::io(path, e))?;

    Ok(())
}

/// Truncates the file to exactly `len` bytes.
pub(crate) async fn truncate_to(path: &Path, len: u64) -> Result<(), DownloadError> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.set_len(len)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    Ok(())
}

/// Deletes the local file.
pub(crate) async fn remove_local_file(path: &Path) -> Result<(), DownloadError> {
    fs::remove_file(path)
        .await
        .map_err(|e| DownloadError::io(path, e))
}
