use crate::clock::{Clock, MonotonicClock};
use crate::rate_limit::store::{RateLimitWindow, WindowStore};
use crate::rate_limit::sweeper::SweeperHandle;
use crate::rate_limit::{Action, Decision, RateLimitConfig, ANONYMOUS_IDENTIFIER};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-window rate limiter.
///
/// Cheap to clone; clones share the same windows, so one instance can be handed to
/// every consumer and to the sweeper.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<WindowStore>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::default()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { store: Arc::new(WindowStore::new()), clock }
    }

    /// Count one request for `(identifier, action)` under `config`.
    pub fn check(&self, identifier: &str, action: &str, config: RateLimitConfig) -> Decision {
        let decision = self.store.check(identifier, action, &config, self.clock.now_millis());
        if !decision.allowed {
            tracing::debug!(identifier, action, reset_in = ?decision.reset_in, "rate limit exceeded");
        }
        decision
    }

    /// Check a table action. A missing identifier counts against the shared anonymous one.
    pub fn check_action(&self, identifier: Option<&str>, action: Action) -> Decision {
        let identifier = identifier.filter(|id| !id.is_empty()).unwrap_or(ANONYMOUS_IDENTIFIER);
        self.check(identifier, action.as_str(), action.config())
    }

    /// Drop expired windows now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.store.sweep(self.clock.now_millis())
    }

    /// Run [`sweep`](Self::sweep) every `every` on the current tokio runtime.
    pub fn spawn_sweeper(&self, every: Duration) -> SweeperHandle {
        SweeperHandle::spawn(self.clone(), every)
    }

    pub fn window(&self, identifier: &str, action: &str) -> Option<RateLimitWindow> {
        self.store.get(identifier, action)
    }

    /// Number of stored windows, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn reset(&self) {
        self.store.clear();
    }
}
