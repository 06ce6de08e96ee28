//! Retry logic with exponential backoff for transient chunk-fetch failures.
//!
//! When a range fetch fails, the store error is classified into a
//! [`FailureType`]:
//! - [`FailureType::Transient`] - network/timeout-class failures that may
//!   succeed on retry
//! - [`FailureType::Permanent`] - failures that won't succeed regardless of
//!   retries (not found, permission denied, protocol violations)
//!
//! [`RetryPolicy`] then decides whether to retry given the attempt count,
//! producing the backoff delay. Backoff doubles each attempt
//! (`base * 2^(attempt-1)`), is capped, and carries random jitter so a burst
//! of failing workers doesn't retry in lockstep.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::store::StoreError;

/// Default per-chunk transient retry ceiling.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a chunk-fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: connection reset, timeout, 5xx from the backend.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: object not found, permission denied, unsatisfiable range.
    Permanent,
}

/// Decision on whether to retry a failed chunk fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the fetch after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (the initial fetch is attempt 1).
        attempt: u32,
    },

    /// Do not retry the fetch.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// `max_retries` counts retries, not attempts: a chunk is fetched at most
/// `max_retries + 1` times. Delay for the retry after failed attempt `n` is
/// `min(base_delay * multiplier^(n-1), max_delay) + jitter`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    max_retries: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt (typically 2.0 for doubling).
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    #[must_use]
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Creates a policy with a custom retry ceiling, using defaults for the
    /// delay parameters.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the configured retry ceiling.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Determines whether to retry a failed chunk fetch.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::DoNotRetry {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt > self.max_retries {
            debug!(attempt, max_retries = self.max_retries, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max retries ({}) exhausted", self.max_retries),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay before the retry that follows failed attempt
    /// `attempt`, with exponential backoff and jitter.
    ///
    /// The exponent counts completed failures, so the first retry waits
    /// exactly `base_delay` and each later one doubles it: 1s, 2s, 4s, ...
    /// capped at `max_delay`.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt is 1-indexed; the first retry waits exactly base_delay.
        let exponent = f64::from(attempt - 1);
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + calculate_jitter()
    }
}

/// Generates random jitter between 0 and [`MAX_JITTER`].
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Classifies a store error into a failure type for retry decisions.
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | Timeout | Transient | Network may recover |
/// | Network | Transient | Backend may come back |
/// | Http 408/429/5xx | Transient | Temporary server-side conditions |
/// | Http other | Permanent | Client-side problem, retry won't help |
/// | NotFound | Permanent | Object doesn't exist (or vanished mid-session) |
/// | PermissionDenied | Permanent | Credentials won't improve on retry |
/// | InvalidRange | Permanent | Range arithmetic disagrees with the object |
/// | Backend | Permanent | Protocol violation |
#[must_use]
pub fn classify_store_error(error: &StoreError) -> FailureType {
    match error {
        StoreError::Timeout { .. } | StoreError::Network { .. } => FailureType::Transient,

        StoreError::Http { status, .. } => classify_http_status(*status),

        StoreError::NotFound { .. }
        | StoreError::PermissionDenied { .. }
        | StoreError::InvalidRange { .. }
        | StoreError::Backend { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 => FailureType::Transient,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
