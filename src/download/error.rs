//! Error types for the download engine.
//!
//! Session-level failures carry enough context to act on: chunk failures are
//! annotated with their byte range and attempt count so a caller can log
//! them and simply re-invoke the download later - the partial local file is
//! left in place for resumption.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can fail a download session.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The initial size probe failed. Probe errors are fatal and never
    /// retried; retry policy applies to chunk fetches only.
    #[error("probing {path}: {source}")]
    Probe {
        /// The remote object path.
        path: String,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// A chunk fetch failed permanently or exhausted its retries.
    #[error("chunk [{start}, {end}) failed after {attempts} attempt(s): {source}")]
    ChunkFailed {
        /// Start of the failed chunk range (inclusive).
        start: u64,
        /// End of the failed chunk range (exclusive).
        end: u64,
        /// Total fetch attempts made for this chunk.
        attempts: u32,
        /// The final store error.
        #[source]
        source: StoreError,
    },

    /// A range fetch returned a different byte count than the clamped
    /// expectation. The remote object changed underneath the session;
    /// treated as permanent.
    #[error("chunk [{start}, {end}): expected {expected} bytes, got {actual}")]
    RangeMismatch {
        /// Start of the chunk range (inclusive).
        start: u64,
        /// End of the chunk range (exclusive).
        end: u64,
        /// Bytes the clamped range should have produced.
        expected: u64,
        /// Bytes actually returned.
        actual: u64,
    },

    /// Local file system error (create, positioned write, truncate). Fatal;
    /// local I/O failures are not expected to be transient.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The local file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Every chunk reported success but the final file length is wrong.
    /// Guards against silent truncation bugs.
    #[error("incomplete download to {path}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Incomplete {
        /// The local file path.
        path: PathBuf,
        /// Expected size in bytes (the probed remote size).
        expected_bytes: u64,
        /// Actual local file size in bytes.
        actual_bytes: u64,
    },

    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be between 1 and 100")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Invalid chunk size provided.
    #[error("chunk_size must be greater than zero")]
    InvalidChunkSize,

    /// A download worker task panicked or the pool was torn down unexpectedly.
    #[error("download worker failed: {detail}")]
    Worker {
        /// Description of the worker failure.
        detail: String,
    },
}

impl DownloadError {
    /// Creates a probe error from a store error.
    pub fn probe(path: impl Into<String>, source: StoreError) -> Self {
        Self::Probe {
            path: path.into(),
            source,
        }
    }

    /// Creates a chunk failure annotated with its range and attempt count.
    pub fn chunk_failed(start: u64, end: u64, attempts: u32, source: StoreError) -> Self {
        Self::ChunkFailed {
            start,
            end,
            attempts,
            source,
        }
    }

    /// Creates a range-mismatch error.
    pub fn range_mismatch(start: u64, end: u64, expected: u64, actual: u64) -> Self {
        Self::RangeMismatch {
            start,
            end,
            expected,
            actual,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an incomplete-download error.
    pub fn incomplete(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Incomplete {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }
}

// Note on From trait implementations:
// We intentionally do NOT implement `From<StoreError>` or `From<std::io::Error>`
// because the variants require context (remote path, chunk range, local path)
// that the source errors don't carry. The helper constructors are the pattern
// here.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_failed_display_includes_range_and_attempts() {
        let error =
            DownloadError::chunk_failed(1000, 2000, 4, StoreError::timeout("bucket/data.bin"));
        let msg = error.to_string();
        assert!(msg.contains("[1000, 2000)"), "Expected range in: {msg}");
        assert!(msg.contains("4 attempt"), "Expected attempts in: {msg}");
    }

    #[test]
    fn test_incomplete_display() {
        let error = DownloadError::incomplete("/tmp/out.bin", 100, 99);
        let msg = error.to_string();
        assert!(msg.contains("incomplete"), "Expected 'incomplete' in: {msg}");
        assert!(msg.contains("100"), "Expected expected size in: {msg}");
        assert!(msg.contains("99"), "Expected actual size in: {msg}");
    }

    #[test]
    fn test_io_display_includes_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = DownloadError::io(PathBuf::from("/tmp/out.bin"), io_error);
        assert!(error.to_string().contains("/tmp/out.bin"));
    }

    #[test]
    fn test_range_mismatch_display() {
        let error = DownloadError::range_mismatch(0, 1000, 1000, 999);
        let msg = error.to_string();
        assert!(msg.contains("expected 1000"), "Expected count in: {msg}");
        assert!(msg.contains("got 999"), "Expected actual in: {msg}");
    }

    #[test]
    fn test_probe_preserves_source() {
        let error = DownloadError::probe("obj", StoreError::not_found("obj"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
