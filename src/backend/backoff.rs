//! Delay schedule between retry attempts.
//!
//! [`BackoffPolicy`] decides how long the retry loop waits after a failed
//! attempt. With exponential backoff enabled the delay doubles on every
//! attempt; otherwise it stays at the base delay.

use std::time::Duration;

/// Retry budget and delay schedule.
///
/// # Example
///
/// ```
/// use pr_summary_client::backend::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::exponential(3, Duration::from_millis(100));
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
/// assert_eq!(policy.max_attempts(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Double the delay on every subsequent attempt.
    pub exponential: bool,
}

impl BackoffPolicy {
    /// No retries: a single attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            exponential: false,
        }
    }

    /// Constant delay between attempts.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: delay,
            exponential: false,
        }
    }

    /// Delay grows as `base_delay * 2^attempt`.
    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            exponential: true,
        }
    }

    /// Upper bound on attempts for one logical call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after attempt N (0-indexed) has failed.
    ///
    /// Saturates instead of overflowing for large attempt counts.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(
            crate::config::DEFAULT_MAX_RETRIES,
            Duration::from_millis(crate::config::DEFAULT_RETRY_DELAY_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_exponential() {
        let policy = BackoffPolicy::exponential(5, Duration::from_secs(1));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_delay_strictly_increases() {
        let policy = BackoffPolicy::exponential(10, Duration::from_millis(100));
        let delays: Vec<_> = (0..10).map(|a| policy.delay_for_attempt(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_backoff_delay_fixed() {
        let policy = BackoffPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = BackoffPolicy::exponential(100, Duration::from_secs(1));
        assert_eq!(
            policy.delay_for_attempt(64),
            Duration::from_secs(u64::from(u32::MAX))
        );
        let huge = BackoffPolicy::exponential(100, Duration::MAX);
        assert_eq!(huge.delay_for_attempt(1), Duration::MAX);
    }

    #[test]
    fn test_backoff_none_preset() {
        let policy = BackoffPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_backoff_default_matches_client_defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert!(policy.exponential);
    }
}
