//! Shared progress accounting for concurrent chunk workers.
//!
//! `bytes_done` is the only mutable state shared across workers; it is a
//! single atomic counter so concurrent completions never lose updates.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Observer invoked with `(bytes_done, total_size)` on every chunk
/// completion.
///
/// The hook runs on whichever worker finished the chunk, so it must not
/// block for long.
pub type ProgressHook = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Monotonic byte counter for one download session.
pub struct ProgressState {
    bytes_done: AtomicU64,
    total_size: u64,
    hook: Option<ProgressHook>,
}

impl ProgressState {
    /// Creates a tracker seeded with the bytes already persisted locally.
    #[must_use]
    pub fn new(initial_bytes: u64, total_size: u64, hook: Option<ProgressHook>) -> Self {
        Self {
            bytes_done: AtomicU64::new(initial_bytes),
            total_size,
            hook,
        }
    }

    /// Records `bytes` more persisted bytes and notifies the hook.
    pub fn record(&self, bytes: u64) {
        let done = self.bytes_done.fetch_add(bytes, Ordering::SeqCst) + bytes;
        if let Some(hook) = &self.hook {
            hook(done, self.total_size);
        }
    }

    /// Bytes persisted so far.
    #[must_use]
    pub fn bytes_done(&self) -> u64 {
        self.bytes_done.load(Ordering::SeqCst)
    }

    /// Total size of the remote object.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl fmt::Debug for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressState")
            .field("bytes_done", &self.bytes_done())
            .field("total_size", &self.total_size)
            .field("hook", &self.hook.as_ref().map(|_| "..."))
            .finish()
    }
}
