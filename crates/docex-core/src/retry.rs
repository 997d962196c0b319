//! Retry policy with capped exponential backoff for extraction tasks

use std::time::Duration;

/// Delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Decides whether a failed attempt is retried and how long to wait first.
///
/// Attempt indices are 0-based: index 0 is the initial try. A work item gets
/// at most `max_retries + 1` attempts. Every failure cause is treated the same,
/// so an unparseable response consumes a retry exactly like a transport error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_retries,
            base,
            cap,
        }
    }

    /// Policy with the default 1s base and 10s cap
    pub const fn with_retries(max_retries: u32) -> Self {
        Self::new(max_retries, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed, initial try included
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Whether the attempt at `attempt_index` may be followed by another one
    pub const fn should_retry(&self, attempt_index: u32) -> bool {
        attempt_index < self.max_retries
    }

    /// `min(base * 2^attempt_index, cap)`
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(3)
    }
}
