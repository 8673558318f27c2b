//! In-memory window map shared by checks and the expiry sweep.
//!
//! Both operations take the same mutex, so a sweep can never interleave with a check
//! for the same key. Only windows with `reset_at <= now` are swept; such a window would
//! be replaced by the next check anyway.

use crate::rate_limit::{Decision, RateLimitConfig};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Counter for one `(identifier, action)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub count: u32,
    pub reset_at_millis: u64,
}

impl RateLimitWindow {
    fn open(now_millis: u64, config: &RateLimitConfig) -> Self {
        Self { count: 0, reset_at_millis: now_millis.saturating_add(config.window_ms()) }
    }

    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.reset_at_millis
    }

    pub fn reset_in(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.reset_at_millis.saturating_sub(now_millis))
    }
}

type WindowKey = (String, String);

#[derive(Debug, Default)]
pub struct WindowStore {
    windows: Mutex<HashMap<WindowKey, RateLimitWindow>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request for `(identifier, action)` at `now_millis`.
    pub fn check(
        &self,
        identifier: &str,
        action: &str,
        config: &RateLimitConfig,
        now_millis: u64,
    ) -> Decision {
        let mut windows = self.windows.lock().expect("rate limit store poisoned");
        let window = windows
            .entry((identifier.to_string(), action.to_string()))
            .or_insert_with(|| RateLimitWindow::open(now_millis, config));

        if window.is_expired(now_millis) {
            *window = RateLimitWindow::open(now_millis, config);
        }

        let reset_in = window.reset_in(now_millis);
        if window.count >= config.max_requests() {
            return Decision { allowed: false, remaining: 0, reset_in };
        }
        window.count += 1;
        Decision { allowed: true, remaining: config.max_requests() - window.count, reset_in }
    }

    /// Remove every window whose reset time has passed. Returns how many were removed.
    pub fn sweep(&self, now_millis: u64) -> usize {
        let mut windows = self.windows.lock().expect("rate limit store poisoned");
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now_millis));
        before - windows.len()
    }

    pub fn get(&self, identifier: &str, action: &str) -> Option<RateLimitWindow> {
        self.windows
            .lock()
            .expect("rate limit store poisoned")
            .get(&(identifier.to_string(), action.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().expect("rate limit store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.windows.lock().expect("rate limit store poisoned").clear();
    }
}
