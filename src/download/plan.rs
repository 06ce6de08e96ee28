//! Resume classification and chunk-range planning.
//!
//! Resumability is derived purely from the local file's length: nothing else
//! is persisted between invocations. Classification compares that length to
//! the probed remote size and picks one of four paths (§[`ResumePlan`]).
//!
//! Chunk planning carries the engine's central correctness workaround: a
//! class of storage backends truncates a range response by exactly one byte
//! when the requested end equals the object's last valid byte index.
//! Requesting strictly beyond the end avoids the bug - the backend clamps
//! the response to the true object length and the final byte arrives intact.
//! The chunk that would otherwise end at the last byte therefore requests
//! `total_size + TAIL_OVERSHOOT_BYTES` instead.

/// Over-request applied past the end of the object on the tail range.
pub const TAIL_OVERSHOOT_BYTES: u64 = 1000;

/// Remainders smaller than this take the tail-rewrite path instead of the
/// general chunking path. Below a kilobyte remaining, the cost of the
/// rewrite window is negligible next to the risk of tripping the tail-byte
/// bug on a tiny single-chunk remainder.
pub const TINY_TAIL_THRESHOLD: u64 = 1024;

/// How far the tail rewrite rewinds behind the resume offset (1 MiB).
pub const TAIL_REWIND_WINDOW: u64 = 1024 * 1024;

/// A half-open `[start, end)` byte interval requested from the remote
/// object in one fetch.
///
/// The final range of a plan intentionally has `end > total_size`; the
/// backend clamps the response to the object's true length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// First byte of the range (inclusive).
    pub start: u64,
    /// One past the last requested byte (exclusive; may exceed the object).
    pub end: u64,
}

impl ChunkRange {
    /// Number of bytes requested (before any backend clamping).
    #[must_use]
    pub fn requested_len(&self) -> u64 {
        self.end - self.start
    }

    /// Number of bytes this range will actually produce for an object of
    /// `total_size` bytes, after backend clamping.
    #[must_use]
    pub fn expected_len(&self, total_size: u64) -> u64 {
        self.end.min(total_size).saturating_sub(self.start)
    }
}

/// How a download session proceeds, given the remote size and the length of
/// any partially downloaded local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Local file already holds the whole object; nothing to fetch.
    AlreadyComplete,

    /// Local file is larger than the remote object - assume it's the wrong
    /// or corrupt file, discard it, and restart from offset 0.
    DiscardAndRestart,

    /// Less than [`TINY_TAIL_THRESHOLD`] bytes remain; rewind and rewrite
    /// the trailing window in one piece instead of chunking.
    TailRewrite {
        /// Resume offset (the local file's current length).
        start_offset: u64,
    },

    /// Normal path, including a fresh start: chunk `[start_offset, total)`.
    Chunked {
        /// Resume offset (the local file's current length).
        start_offset: u64,
    },
}

/// Classifies a session from the probed remote size and the local file
/// length (0 if the file does not exist).
#[must_use]
pub fn classify_resume(total_size: u64, local_size: u64) -> ResumePlan {
    if local_size == total_size {
        ResumePlan::AlreadyComplete
    } else if local_size > total_size {
        ResumePlan::DiscardAndRestart
    } else if total_size - local_size < TINY_TAIL_THRESHOLD {
        ResumePlan::TailRewrite {
            start_offset: local_size,
        }
    } else {
        ResumePlan::Chunked {
            start_offset: local_size,
        }
    }
}

/// Partitions `[start_offset, total_size)` into `chunk_size` ranges.
///
/// Ranges are contiguous and non-overlapping. The range containing the
/// object's final byte requests `total_size + TAIL_OVERSHOOT_BYTES` rather
/// than ending at the last byte index (see module docs).
#[must_use]
pub fn plan_chunks(start_offset: u64, total_size: u64, chunk_size: u64) -> Vec<ChunkRange> {
    debug_assert!(chunk_size > 0, "chunk_size validated by DownloadOptions");
    debug_assert!(start_offset <= total_size);

    let mut ranges = Vec::new();
    let mut offset = start_offset;
    while offset < total_size {
        let natural_end = offset.saturating_add(chunk_size);
        let end = if natural_end >= total_size {
            // This chunk includes the object's last byte: over-request.
            total_size.saturating_add(TAIL_OVERSHOOT_BYTES)
        } else {
            natural_end
        };
        ranges.push(ChunkRange { start: offset, end });
        offset = natural_end;
    }
    ranges
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_equal_sizes_already_complete() {
        assert_eq!(classify_resume(1000, 1000), ResumePlan::AlreadyComplete);
    }

    #[test]
    fn test_classify_zero_size_object_already_complete() {
        assert_eq!(classify_resume(0, 0), ResumePlan::AlreadyComplete);
    }

    #[test]
    fn test_classify_oversize_local_discards() {
        assert_eq!(classify_resume(1000, 1001), ResumePlan::DiscardAndRestart);
        assert_eq!(classify_resume(0, 5), ResumePlan::DiscardAndRestart);
    }

    #[test]
    fn test_classify_small_remainder_takes_tail_rewrite() {
        assert_eq!(
            classify_resume(10_000, 9_500),
            ResumePlan::TailRewrite { start_offset: 9_500 }
        );
        // Exactly one byte short.
        assert_eq!(
            classify_resume(10_000, 9_999),
            ResumePlan::TailRewrite {
                start_offset: 9_999
            }
        );
    }

    #[test]
    fn test_classify_threshold_boundary() {
        // Remaining == threshold goes through the normal chunked path.
        assert_eq!(
            classify_resume(10_000, 10_000 - TINY_TAIL_THRESHOLD),
            ResumePlan::Chunked {
                start_offset: 10_000 - TINY_TAIL_THRESHOLD
            }
        );
        // One byte under the threshold rewrites the tail.
        assert_eq!(
            classify_resume(10_000, 10_000 - TINY_TAIL_THRESHOLD + 1),
            ResumePlan::TailRewrite {
                start_offset: 10_000 - TINY_TAIL_THRESHOLD + 1
            }
        );
    }

    #[test]
    fn test_classify_fresh_start_is_chunked() {
        assert_eq!(
            classify_resume(50_000_000, 0),
            ResumePlan::Chunked { start_offset: 0 }
        );
    }

    #[test]
    fn test_classify_fresh_tiny_object_takes_tail_rewrite() {
        // A brand-new object smaller than the threshold also rewrites;
        // with start_offset 0 the rewind window is empty and the whole
        // object arrives in one request either way.
        assert_eq!(
            classify_resume(500, 0),
            ResumePlan::TailRewrite { start_offset: 0 }
        );
    }

    // ==================== Chunk Planning Tests ====================

    #[test]
    fn test_plan_empty_object_has_no_chunks() {
        assert!(plan_chunks(0, 0, 1024).is_empty());
    }

    #[test]
    fn test_plan_two_even_chunks_with_tail_overshoot() {
        let ranges = plan_chunks(0, 10_000_000, 5_000_000);
        assert_eq!(ranges.len(), 2);
        assert_eq!(
            ranges[0],
            ChunkRange {
                start: 0,
                end: 5_000_000
            }
        );
        assert_eq!(ranges[1].start, 5_000_000);
        assert_eq!(ranges[1].end, 10_000_000 + TAIL_OVERSHOOT_BYTES);
    }

    #[test]
    fn test_plan_single_chunk_overshoots() {
        let ranges = plan_chunks(0, 100, 1024);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges[0].end, 100 + TAIL_OVERSHOOT_BYTES);
    }

    #[test]
    fn test_plan_respects_start_offset() {
        let ranges = plan_chunks(3_000, 10_000, 2_000);
        assert_eq!(ranges[0].start, 3_000);
        let starts: Vec<u64> = ranges.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![3_000, 5_000, 7_000, 9_000]);
    }

    #[test]
    fn test_plan_final_range_always_exceeds_total_size() {
        for (total, chunk) in [(1u64, 1u64), (1024, 1024), (1025, 1024), (10_000, 3_000)] {
            let ranges = plan_chunks(0, total, chunk);
            let last = ranges.last().unwrap();
            assert!(
                last.end > total,
                "tail end {} must exceed total {total}",
                last.end
            );
        }
    }

    #[test]
    fn test_plan_ranges_contiguous_and_cover_interval() {
        let total = 10_001;
        let ranges = plan_chunks(500, total, 1_000);
        let mut expected_start = 500;
        for range in &ranges {
            assert_eq!(range.start, expected_start);
            expected_start = range.start + 1_000;
        }
        // Clamped coverage sums to exactly the remaining bytes.
        let covered: u64 = ranges.iter().map(|r| r.expected_len(total)).sum();
        assert_eq!(covered, total - 500);
    }

    #[test]
    fn test_chunk_exactly_reaching_last_byte_is_overshot() {
        // 2048/1024: the second chunk's natural end lands exactly on the
        // last byte index and must be replaced with an over-request.
        let ranges = plan_chunks(0, 2_048, 1_024);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].end, 1_024);
        assert_eq!(ranges[1].end, 2_048 + TAIL_OVERSHOOT_BYTES);
    }

    #[test]
    fn test_expected_len_clamps_to_object() {
        let tail = ChunkRange {
            start: 9_000,
            end: 11_000,
        };
        assert_eq!(tail.expected_len(10_000), 1_000);
        assert_eq!(tail.requested_len(), 2_000);
    }
}
