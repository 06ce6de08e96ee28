//! Tail rewrite for nearly complete resumes.
//!
//! When fewer than [`TINY_TAIL_THRESHOLD`](super::plan::TINY_TAIL_THRESHOLD)
//! bytes remain, the session does not trust the last bytes already on disk:
//! an interrupted positional write may have left a torn tail that a pure
//! append would silently preserve. Instead the engine rewinds up to
//! [`TAIL_REWIND_WINDOW`](super::plan::TAIL_REWIND_WINDOW) bytes behind the
//! resume offset, fetches the whole trailing window in one over-requested
//! range, truncates the file at the rewind point, and rewrites the window.

use std::path::Path;

use tracing::{debug, instrument};

use crate::store::ObjectStore;

use super::engine::fetch_range_with_retry;
use super::error::DownloadError;
use super::plan::{ChunkRange, TAIL_OVERSHOOT_BYTES, TAIL_REWIND_WINDOW};
use super::progress::{ProgressHook, ProgressState};
use super::retry::RetryPolicy;
use super::writer;

/// Fetches and rewrites the trailing window of the file in one range.
#[instrument(skip(store, hook, policy))]
pub(crate) async fn rewrite_tail(
    store: &dyn ObjectStore,
    remote_path: &str,
    local_path: &Path,
    total_size: u64,
    start_offset: u64,
    policy: &RetryPolicy,
    hook: Option<ProgressHook>,
) -> Result<(), DownloadError> {
    let rewind_size = TAIL_REWIND_WINDOW.min(start_offset);
    let rewind_to = start_offset - rewind_size;

    let range = ChunkRange {
        start: rewind_to,
        end: total_size.saturating_add(TAIL_OVERSHOOT_BYTES),
    };

    debug!(
        rewind_to,
        range_end = range.end,
        "rewriting tail window in one range"
    );

    let data = fetch_range_with_retry(store, remote_path, range, policy).await?;

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

    writer::create_local_file(local_path).await?;
    writer::truncate_to(local_path, rewind_to).await?;
    writer::write_at(local_path, rewind_to, &data).await?;

    let progress = ProgressState::new(rewind_to, total_size, hook);
    progress.record(actual);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::tempdir;
    use tokio::fs;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_rewrite_replaces_trailing_window() {
        let body = patterned(4096);
        let store = InMemoryStore::new();
        store.put("obj", Bytes::from(body.clone()));

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        // Local copy is 4000 bytes and its last 100 bytes are garbage.
        let mut local = body[..4000].to_vec();
        for byte in &mut local[3900..] {
            *byte = 0xFF;
        }
        fs::write(&path, &local).await.unwrap();

        rewrite_tail(
            &store,
            "obj",
            &path,
            4096,
            4000,
            &RetryPolicy::default(),
            None,
        )
        .await
        .unwrap();

        // Rewind covers the whole file here (4000 < 1 MiB), so the garbage
        // is gone and the content matches the remote exactly.
        assert_eq!(fs::read(&path).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_rewrite_from_offset_zero_fetches_whole_object() {
        let body = patterned(500);
        let store = InMemoryStore::new();
        store.put("obj", Bytes::from(body.clone()));

        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.bin");

        rewrite_tail(
            &store,
            "obj",
            &path,
            500,
            0,
            &RetryPolicy::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_rewrite_reports_progress_as_complete() {
        let body = patterned(2000);
        let store = InMemoryStore::new();
        store.put("obj", Bytes::from(body.clone()));

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, &body[..1500]).await.unwrap();

        let last_done = Arc::new(AtomicU64::new(0));
        let last_done_clone = Arc::clone(&last_done);
        let hook: ProgressHook = Arc::new(move |done, total| {
            assert_eq!(total, 2000);
            last_done_clone.store(done, Ordering::SeqCst);
        });

        rewrite_tail(
            &store,
            "obj",
            &path,
            2000,
            1500,
            &RetryPolicy::default(),
            Some(hook),
        )
        .await
        .unwrap();

        assert_eq!(last_done.load(Ordering::SeqCst), 2000);
    }
}
