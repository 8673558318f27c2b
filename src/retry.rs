//! Retry policy for fallible async operations.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries).
//! - `should_retry` decides whether an error is retryable; a non-retryable error is
//!   returned immediately.
//! - Between failed attempts the policy sleeps `backoff.delay(attempt + 1)` (after
//!   jitter). Nothing is slept after the final attempt.
//! - On exhaustion the *last* error is returned. Earlier failures are only logged.
//!
//! ```rust
//! use std::time::Duration;
//! use regionkit::{Backoff, FetchError, InstantSleeper, RetryPolicy};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<FetchError>::builder()
//!     .retries(2)
//!     .backoff(Backoff::exponential(Duration::from_millis(500)))
//!     .with_sleeper(InstantSleeper)
//!     .build()
//!     .unwrap();
//! let result: Result<(), FetchError> =
//!     policy.execute(|| async { Err(FetchError::Network("offline".into())) }).await;
//! assert!(result.is_err());
//! # });
//! ```

use crate::error::BuildError;
use crate::{Backoff, Jitter, Sleeper, TokioSleeper};
use std::future::Future;
use std::sync::Arc;

/// Retries the region fetch performs after the first attempt.
pub const DEFAULT_RETRIES: usize = 2;

/// Retry policy combining backoff, jitter, predicate, and sleeper.
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            jitter: self.jitter,
            should_retry: self.should_retry.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("sleeper", &self.sleeper)
            .field("should_retry", &"<predicate>")
            .finish()
    }
}

impl<E> RetryPolicy<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Execute an async operation with retry semantics.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<T, E>
    where
        T: Send,
        Fut: Future<Output = Result<T, E>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !(self.should_retry)(&err) {
                return Err(err);
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                tracing::warn!(attempts = attempt, error = %err, "retry exhausted");
                return Err(err);
            }

            let delay = self.jitter.apply(self.backoff.delay(attempt));
            tracing::debug!(attempt, ?delay, error = %err, "attempt failed, backing off");
            self.sleeper.sleep(delay).await;
        }
    }
}

/// Builder for `RetryPolicy`.
pub struct RetryPolicyBuilder<E> {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> RetryPolicyBuilder<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Defaults: 2 retries, 500ms exponential backoff, no jitter, retry everything.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_RETRIES + 1,
            backoff: Backoff::default(),
            jitter: Jitter::None,
            should_retry: Arc::new(|_| true),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn retries(self, retries: usize) -> Self {
        self.max_attempts(retries.saturating_add(1))
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Predicate to decide if an error is retryable.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub(crate) fn with_shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<RetryPolicy<E>, BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            jitter: self.jitter,
            should_retry: self.should_retry,
            sleeper: self.sleeper,
        })
    }
}

impl<E> Default for RetryPolicyBuilder<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
