//! objfetch - chunked, resumable, concurrent object downloads.
//!
//! This library transfers a single large remote object into local storage
//! using range-based partial reads. Interrupted transfers resume from the
//! length of the partially written local file; chunks are fetched through a
//! bounded worker pool with retry and exponential backoff, and written to
//! their exact byte offsets so completion order never matters.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`store`] - The storage collaborator boundary: the [`ObjectStore`] trait
//!   plus HTTP and in-memory implementations
//! - [`download`] - The download engine: resume planning, chunk scheduling,
//!   the fetch/retry worker pool, positional writes, and progress tracking

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod store;

// Re-export commonly used types
pub use download::{
    ChunkRange, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DownloadEngine,
    DownloadError, DownloadOptions, FailureType, ProgressHook, ResumePlan, RetryDecision,
    RetryPolicy, classify_store_error, download,
};
pub use store::{HttpStore, InMemoryStore, ObjectMeta, ObjectStore, StoreError};
