//! Backoff strategies for retried fetches.
//!
//! Attempt semantics: attempt index `0` is the initial call (no delay) and retries start
//! at `attempt = 1`. For exponential backoff the delay before retry `n` is
//! `base * 2^(n-1)`, so a 500ms base yields 500ms, 1000ms, 2000ms, ...
//!
//! ```rust
//! use std::time::Duration;
//! use regionkit::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(500));
//! assert_eq!(backoff.delay(0), Duration::ZERO);
//! assert_eq!(backoff.delay(1), Duration::from_millis(500));
//! assert_eq!(backoff.delay(2), Duration::from_millis(1000));
//! ```
//!
//! Computations that would overflow saturate to `MAX_BACKOFF` (1 day).

use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackoffError {
    #[error("with_max is only valid for exponential backoff")]
    ConstantDoesNotSupportMax,
    #[error("max must be greater than zero")]
    MaxMustBePositive,
    #[error("max ({max:?}) must be >= base ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BackoffKind {
    Constant { delay: Duration },
    Exponential { base: Duration, max: Option<Duration> },
}

/// Delay schedule applied between failed attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    kind: BackoffKind,
}

impl Backoff {
    /// Same delay before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self { kind: BackoffKind::Constant { delay } }
    }

    /// Delay doubling with every retry, starting at `base`.
    pub fn exponential(base: Duration) -> Self {
        Self { kind: BackoffKind::Exponential { base, max: None } }
    }

    /// Cap an exponential schedule at `max`.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        match &mut self.kind {
            BackoffKind::Exponential { base, max: existing } => {
                if max < *base {
                    return Err(BackoffError::MaxLessThanBase { base: *base, max });
                }
                *existing = Some(max);
                Ok(self)
            }
            BackoffKind::Constant { .. } => Err(BackoffError::ConstantDoesNotSupportMax),
        }
    }

    /// Delay before `attempt` (0 = initial call, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match &self.kind {
            BackoffKind::Constant { delay } => (*delay).min(MAX_BACKOFF),
            BackoffKind::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
                let multiplier = 2u128.saturating_pow(exponent);
                let nanos = base.as_nanos().saturating_mul(multiplier);
                let delay = Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64);
                max.map(|m| delay.min(m)).unwrap_or(delay).min(MAX_BACKOFF)
            }
        }
    }
}

impl Default for Backoff {
    /// 500ms exponential, the region fetch schedule.
    fn default() -> Self {
        Self::exponential(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_matches_region_fetch() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_millis(1000));
        assert_eq!(backoff.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn constant_backoff_returns_same_delay() {
        let backoff = Backoff::constant(Duration::from_secs(1));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(100), Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_respects_max() {
        let backoff = Backoff::exponential(Duration::from_millis(100))
            .with_max(Duration::from_secs(1))
            .unwrap();
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_handles_overflow() {
        let backoff = Backoff::exponential(Duration::from_secs(1));
        assert_eq!(backoff.delay(1_000_000_000), MAX_BACKOFF);
        assert_eq!(backoff.delay((u32::MAX as usize) + 10_000), MAX_BACKOFF);
    }

    #[test]
    fn with_max_rejects_bad_caps() {
        let constant = Backoff::constant(Duration::from_secs(5)).with_max(Duration::from_secs(1));
        assert_eq!(constant, Err(BackoffError::ConstantDoesNotSupportMax));

        let zero = Backoff::exponential(Duration::from_secs(1)).with_max(Duration::ZERO);
        assert_eq!(zero, Err(BackoffError::MaxMustBePositive));

        let below = Backoff::exponential(Duration::from_secs(100)).with_max(Duration::from_secs(50));
        assert!(matches!(below, Err(BackoffError::MaxLessThanBase { .. })));
    }
}
