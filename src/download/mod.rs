//! Chunked, resumable download engine.
//!
//! This module turns a remote object reachable through
//! [`ObjectStore`](crate::store::ObjectStore) into a local file:
//!
//! - the remote size is probed once and compared against the local file's
//!   length to classify the session (fresh start, resume, already complete,
//!   oversize restart, or tiny-tail rewrite)
//! - the remaining byte interval is partitioned into fixed-size chunk
//!   ranges, with the final range deliberately over-requested past the end
//!   of the object to dodge a backend off-by-one bug on tail ranges
//! - chunks are fetched by a bounded worker pool with per-chunk retry and
//!   exponential backoff, and each is written at its exact byte offset, so
//!   completion order is irrelevant
//!
//! The partially written local file is the only persisted state; a later
//! invocation resumes purely from its length.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use objfetch::{download, DownloadOptions, HttpStore};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("https://storage.example.com/bucket/")?;
//! let store = Arc::new(HttpStore::new(base));
//! download(store, "exports/big.bin", Path::new("./big.bin"), DownloadOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod plan;
mod progress;
mod retry;
mod tail;
mod writer;

pub use engine::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DownloadEngine, DownloadOptions, download,
};
pub use error::DownloadError;
pub use plan::{
    ChunkRange, ResumePlan, TAIL_OVERSHOOT_BYTES, TAIL_REWIND_WINDOW, TINY_TAIL_THRESHOLD,
    classify_resume, plan_chunks,
};
pub use progress::{ProgressHook, ProgressState};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_store_error,
};
