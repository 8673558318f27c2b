//! Fixed-window rate limiting keyed by `(identifier, action)`.
//!
//! - [`RateLimiter`]: synchronous `check` against a shared window map.
//! - [`WindowStore`]: the map itself plus the expiry sweep.
//! - [`SweeperHandle`]: background task running the sweep on a ticker.
//! - [`RateLimitLayer`]: tower middleware that gates a service on a check.
//!
//! A window opens on the first request for a key and lasts `window_ms`. Allowed
//! requests increment the count up to `max_requests`; denied requests leave it alone.
//! Once `now >= reset_at` the window is stale and the next request opens a new one.
//! The sweep only removes stale windows, so it never changes a decision.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod fixed_window;
pub mod middleware;
pub mod store;
pub mod sweeper;

pub use fixed_window::RateLimiter;
pub use middleware::{RateLimitLayer, RateLimitService};
pub use store::{RateLimitWindow, WindowStore};
pub use sweeper::{SweeperHandle, DEFAULT_SWEEP_INTERVAL};

/// Identifier used when the caller has no user or session id.
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// Threshold and window length for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRateLimitConfig", into = "RawRateLimitConfig")]
pub struct RateLimitConfig {
    max_requests: u32,
    window_ms: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRateLimitConfig {
    max_requests: u32,
    window_ms: u64,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        Self::from_millis(max_requests, window_ms)
    }

    pub fn from_millis(max_requests: u32, window_ms: u64) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { max_requests, window_ms })
    }

    // Table entries are non-zero by construction.
    const fn fixed(max_requests: u32, window_ms: u64) -> Self {
        Self { max_requests, window_ms }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl TryFrom<RawRateLimitConfig> for RateLimitConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRateLimitConfig) -> Result<Self, Self::Error> {
        Self::from_millis(raw.max_requests, raw.window_ms)
    }
}

impl From<RateLimitConfig> for RawRateLimitConfig {
    fn from(config: RateLimitConfig) -> Self {
        Self { max_requests: config.max_requests, window_ms: config.window_ms }
    }
}

/// Rate-limited marketplace actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Login,
    Register,
    Checkout,
    AddToCart,
    Search,
    Review,
    VoucherApply,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Login,
        Action::Register,
        Action::Checkout,
        Action::AddToCart,
        Action::Search,
        Action::Review,
        Action::VoucherApply,
    ];

    /// Compiled-in limit for this action.
    pub const fn config(self) -> RateLimitConfig {
        match self {
            Action::Login => RateLimitConfig::fixed(5, 300_000),
            Action::Register => RateLimitConfig::fixed(3, 600_000),
            Action::Checkout => RateLimitConfig::fixed(10, 60_000),
            Action::AddToCart => RateLimitConfig::fixed(30, 60_000),
            Action::Search => RateLimitConfig::fixed(20, 60_000),
            Action::Review => RateLimitConfig::fixed(5, 300_000),
            Action::VoucherApply => RateLimitConfig::fixed(10, 60_000),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Register => "register",
            Action::Checkout => "checkout",
            Action::AddToCart => "addToCart",
            Action::Search => "search",
            Action::Review => "review",
            Action::VoucherApply => "voucherApply",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_in: Duration,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// `reset_in` rounded up to whole seconds, for cooldown messages.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = u64::try_from(self.reset_in.as_millis()).unwrap_or(u64::MAX);
        millis.div_ceil(1000)
    }
}
