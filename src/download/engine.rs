//! Download session orchestration.
//!
//! [`DownloadEngine`] owns the session lifecycle: probe the remote size,
//! classify the resume state, partition the remaining bytes into chunk
//! ranges, and drive a bounded pool of fetch workers. The pool is fail-fast:
//! the first chunk that fails permanently (or exhausts its retries) aborts
//! every in-flight sibling and the session returns that chunk's error. The
//! partial file stays on disk so a later invocation can resume.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::store::ObjectStore;

use super::error::DownloadError;
use super::plan::{ChunkRange, ResumePlan, classify_resume, plan_chunks};
use super::progress::{ProgressHook, ProgressState};
use super::retry::{
    DEFAULT_MAX_RETRIES, RetryDecision, RetryPolicy, classify_store_error,
};
use super::tail;
use super::writer;

/// Default chunk size (32 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Default number of concurrent chunk fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Bounds on the configurable worker count.
const MIN_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 100;

/// Tunables for a download session.
#[derive(Clone)]
pub struct DownloadOptions {
    /// Bytes requested per chunk range.
    pub chunk_size: u64,

    /// Maximum chunk fetches in flight at once (1..=100).
    pub concurrency: usize,

    /// Transient retries per chunk after the initial attempt.
    pub max_retries: u32,

    /// Optional observer called with `(bytes_done, total_size)` after each
    /// chunk is written.
    pub on_progress: Option<ProgressHook>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            on_progress: None,
        }
    }
}

impl DownloadOptions {
    /// Sets the chunk size in bytes.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-chunk transient retry ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the progress observer.
    #[must_use]
    pub fn with_progress_hook(mut self, hook: ProgressHook) -> Self {
        self.on_progress = Some(hook);
        self
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Downloads one remote object to one local file through any
/// [`ObjectStore`].
pub struct DownloadEngine {
    store: Arc<dyn ObjectStore>,
    options: DownloadOptions,
    retry_policy: RetryPolicy,
}

impl DownloadEngine {
    /// Creates an engine, validating the options.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidConcurrency`] if `concurrency` is
    /// outside `1..=100`, or [`DownloadError::InvalidChunkSize`] if
    /// `chunk_size` is zero.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        options: DownloadOptions,
    ) -> Result<Self, DownloadError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.concurrency) {
            return Err(DownloadError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        if options.chunk_size == 0 {
            return Err(DownloadError::InvalidChunkSize);
        }

        let retry_policy = RetryPolicy::with_max_retries(options.max_retries);

        Ok(Self {
            store,
            options,
            retry_policy,
        })
    }

    /// Downloads `remote_path` to `local_path`, resuming from whatever the
    /// local file already holds.
    ///
    /// On failure the partial file is left on disk; invoking this again
    /// continues from its length.
    ///
    /// # Errors
    ///
    /// Returns an error if the size probe fails, a chunk fails permanently
    /// or exhausts its retries, local I/O fails, or the finished file's
    /// length disagrees with the probed size.
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<(), DownloadError> {
        let meta = self
            .store
            .head(remote_path)
            .await
            .map_err(|e| DownloadError::probe(remote_path, e))?;
        let total_size = meta.size;

        let local_size = writer::local_file_size(local_path).await?;
        let plan = classify_resume(total_size, local_size);

        debug!(total_size, local_size, ?plan, "session classified");

        match plan {
            ResumePlan::AlreadyComplete => {
                // An empty remote object classifies here even when the local
                // file does not exist yet; materialize it.
                writer::create_local_file(local_path).await?;
                info!(total_size, "local file already complete");
                Ok(())
            }
            ResumePlan::DiscardAndRestart => {
                warn!(
                    local_size,
                    total_size, "local file larger than remote object; discarding and restarting"
                );
                writer::remove_local_file(local_path).await?;
                self.download_chunks(remote_path, local_path, total_size, 0)
                    .await?;
                self.verify_complete(local_path, total_size).await
            }
            ResumePlan::TailRewrite { start_offset } => {
                tail::rewrite_tail(
                    self.store.as_ref(),
                    remote_path,
                    local_path,
                    total_size,
                    start_offset,
                    &self.retry_policy,
                    self.options.on_progress.clone(),
                )
                .await?;
                self.verify_complete(local_path, total_size).await
            }
            ResumePlan::Chunked { start_offset } => {
                self.download_chunks(remote_path, local_path, total_size, start_offset)
                    .await?;
                self.verify_complete(local_path, total_size).await
            }
        }
    }

    /// Fetches `[start_offset, total_size)` with the bounded worker pool.
    async fn download_chunks(
        &self,
        remote_path: &str,
        local_path: &Path,
        total_size: u64,
        start_offset: u64,
    ) -> Result<(), DownloadError> {
        writer::create_local_file(local_path).await?;

        let ranges = plan_chunks(start_offset, total_size, self.options.chunk_size);
        info!(
            chunks = ranges.len(),
            concurrency = self.options.concurrency,
            start_offset,
            "fetching chunks"
        );

        let progress = Arc::new(ProgressState::new(
            start_offset,
            total_size,
            self.options.on_progress.clone(),
        ));
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let mut tasks: JoinSet<Result<(), DownloadError>> = JoinSet::new();

        for range in ranges {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&progress);
            let policy = self.retry_policy.clone();
            let remote_path = remote_path.to_string();
            let local_path = local_path.to_path_buf();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    DownloadError::Worker {
                        detail: format!("semaphore closed: {e}"),
                    }
                })?;

                let data =
                    fetch_range_with_retry(store.as_ref(), &remote_path, range, &policy).await?;

                let expected = range.expected_len(total_size);
                let actual = data.len() as u64;
                if actual != expected {
                    return Err(DownloadError::range_mismatch(
                        range.start,
                        range.end,
                        expected,
                        actual,
                    ));
                }

                writer::write_at(&local_path, range.start, &data).await?;
                progress.record(actual);
                Ok(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "chunk failed; aborting remaining workers");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(DownloadError::Worker {
                        detail: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Verifies the finished file's length against the probed size.
    async fn verify_complete(
        &self,
        local_path: &Path,
        total_size: u64,
    ) -> Result<(), DownloadError> {
        let final_size = writer::local_file_size(local_path).await?;
        if final_size != total_size {
            return Err(DownloadError::incomplete(local_path, total_size, final_size));
        }
        info!(bytes = total_size, "download complete");
        Ok(())
    }
}

/// Fetches one range, retrying transient failures per `policy`.
///
/// The attempt count embedded in the returned [`DownloadError::ChunkFailed`]
/// includes the initial attempt.
pub(crate) async fn fetch_range_with_retry(
    store: &dyn ObjectStore,
    path: &str,
    range: ChunkRange,
    policy: &RetryPolicy,
) -> Result<Bytes, DownloadError> {
    let mut attempt: u32 = 1;
    loop {
        match store.get_range(path, range.start..range.end).await {
            Ok(data) => return Ok(data),
            Err(e) => {
                let failure = classify_store_error(&e);
                match policy.should_retry(failure, attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next_attempt,
                    } => {
                        warn!(
                            start = range.start,
                            end = range.end,
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "chunk fetch failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt = next_attempt;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        warn!(
                            start = range.start,
                            end = range.end,
                            attempt,
                            reason,
                            error = %e,
                            "chunk fetch failed; giving up"
                        );
                        return Err(DownloadError::chunk_failed(
                            range.start,
                            range.end,
                            attempt,
                            e,
                        ));
                    }
                }
            }
        }
    }
}

/// Downloads `remote_path` from `store` to `local_path`.
///
/// Convenience wrapper that builds a [`DownloadEngine`] for a single
/// session.
///
/// # Errors
///
/// See [`DownloadEngine::download`]; additionally returns the option
/// validation errors from [`DownloadEngine::new`].
pub async fn download(
    store: Arc<dyn ObjectStore>,
    remote_path: &str,
    local_path: &Path,
    options: DownloadOptions,
) -> Result<(), DownloadError> {
    DownloadEngine::new(store, options)?
        .download(remote_path, local_path)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();
        assert_eq!(options.chunk_size, 32 * 1024 * 1024);
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.max_retries, 3);
        assert!(options.on_progress.is_none());
    }

    #[test]
    fn test_options_builder() {
        let options = DownloadOptions::default()
            .with_chunk_size(1024)
            .with_concurrency(2)
            .with_max_retries(7);
        assert_eq!(options.chunk_size, 1024);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.max_retries, 7);
    }

    #[test]
    fn test_new_rejects_zero_concurrency() {
        let store = Arc::new(InMemoryStore::new());
        let result = DownloadEngine::new(store, DownloadOptions::default().with_concurrency(0));
        assert!(matches!(
            result,
            Err(DownloadError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_new_rejects_excessive_concurrency() {
        let store = Arc::new(InMemoryStore::new());
        let result = DownloadEngine::new(store, DownloadOptions::default().with_concurrency(101));
        assert!(matches!(
            result,
            Err(DownloadError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_new_accepts_concurrency_bounds() {
        for concurrency in [1, 100] {
            let store = Arc::new(InMemoryStore::new());
            let result =
                DownloadEngine::new(store, DownloadOptions::default().with_concurrency(concurrency));
            assert!(result.is_ok(), "concurrency {concurrency} should be valid");
        }
    }

    #[test]
    fn test_new_rejects_zero_chunk_size() {
        let store = Arc::new(InMemoryStore::new());
        let result = DownloadEngine::new(store, DownloadOptions::default().with_chunk_size(0));
        assert!(matches!(result, Err(DownloadError::InvalidChunkSize)));
    }

    #[tokio::test]
    async fn test_fetch_range_with_retry_success_first_attempt() {
        let store = InMemoryStore::new();
        store.put("obj", b"0123456789".to_vec());

        let range = ChunkRange { start: 2, end: 6 };
        let data = fetch_range_with_retry(&store, "obj", range, &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(&data[..], b"2345");
    }

    #[tokio::test]
    async fn test_fetch_range_permanent_error_fails_on_first_attempt() {
        let store = InMemoryStore::new();

        let range = ChunkRange { start: 0, end: 10 };
        let err = fetch_range_with_retry(&store, "missing", range, &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::ChunkFailed { attempts: 1, .. }
        ));
    }
}
