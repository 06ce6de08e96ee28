//! Storage collaborator boundary.
//!
//! The download engine consumes remote objects through the [`ObjectStore`]
//! trait: a size/existence probe (`head`) and a half-open byte-range read
//! (`get_range`). Everything behind the trait - backend selection,
//! credentials, transport - is the collaborator's business.
//!
//! Two implementations ship with the crate:
//! - [`HttpStore`] - range requests against any HTTP(S) endpoint
//! - [`InMemoryStore`] - objects held in memory, used by tests and callers
//!   that want to exercise the engine without a network

mod http;
mod memory;

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use http::HttpStore;
pub use memory::InMemoryStore;

/// Metadata returned by a `head` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Current size of the remote object in bytes.
    pub size: u64,
}

/// Errors surfaced by an [`ObjectStore`] implementation.
///
/// The engine classifies these into transient and permanent failures for its
/// retry policy; see [`crate::download::classify_store_error`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("object not found: {path}")]
    NotFound {
        /// The object path that was requested.
        path: String,
    },

    /// The caller is not allowed to read the object.
    #[error("permission denied reading {path}")]
    PermissionDenied {
        /// The object path that was requested.
        path: String,
    },

    /// The request timed out before completing.
    #[error("timeout fetching {path}")]
    Timeout {
        /// The object path that was requested.
        path: String,
    },

    /// Transport-level failure (connection refused, DNS, reset mid-body).
    #[error("network error fetching {path}: {source}")]
    Network {
        /// The object path that was requested.
        path: String,
        /// The underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend answered with an HTTP status not covered by a more
    /// specific variant.
    #[error("HTTP {status} fetching {path}")]
    Http {
        /// The object path that was requested.
        path: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The requested range cannot be satisfied (start beyond end of object).
    #[error("invalid range for {path}: {detail}")]
    InvalidRange {
        /// The object path that was requested.
        path: String,
        /// What was wrong with the range.
        detail: String,
    },

    /// The backend misbehaved in a way retrying cannot fix (malformed
    /// response, range support missing, inconsistent metadata).
    #[error("backend error for {path}: {detail}")]
    Backend {
        /// The object path that was requested.
        path: String,
        /// Description of the backend failure.
        detail: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a permission-denied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(path: impl Into<String>) -> Self {
        Self::Timeout { path: path.into() }
    }

    /// Creates a network error from any transport failure.
    pub fn network(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Creates an HTTP status error.
    pub fn http(path: impl Into<String>, status: u16) -> Self {
        Self::Http {
            path: path.into(),
            status,
        }
    }

    /// Creates an invalid-range error.
    pub fn invalid_range(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidRange {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Backend {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Read access to a remote object store.
///
/// `get_range` takes a half-open `[start, end)` interval. Implementations
/// MUST clamp `end` to the true object length and return the available bytes
/// rather than failing - the engine deliberately over-requests past the end
/// of the object on the final chunk and relies on that clamping.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the object's current size. A missing object surfaces as
    /// [`StoreError::NotFound`].
    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError>;

    /// Returns the bytes in `[range.start, range.end)`, clamped to the
    /// object's length when `range.end` lies beyond it.
    async fn get_range(&self, path: &str, range: Range<u64>) -> Result<Bytes, StoreError>;
}
