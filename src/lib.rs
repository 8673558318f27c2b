#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # regionkit
//!
//! Two small building blocks for a marketplace client:
//!
//! - **Region lookups**: a TTL cache over the province → regency → district → village
//!   hierarchy, backed by a JSON fetch with bounded exponential-backoff retries, plus a
//!   preloader that fills all four address dropdowns concurrently.
//! - **Rate limiting**: fixed-window counters keyed by `(identifier, action)` with a
//!   compiled-in table of per-action limits, a background sweep for expired windows,
//!   and a tower layer.
//!
//! The two halves are independent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regionkit::{Action, RateLimiter, RegionCache, RegionCacheConfig, DEFAULT_SWEEP_INTERVAL};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let regions = RegionCache::new(RegionCacheConfig::default())?;
//!     let chain = regions.preload("11", "1101", "110101").await;
//!     println!("{} provinces, {} villages", chain.provinces.len(), chain.villages.len());
//!
//!     let limiter = RateLimiter::new();
//!     let sweeper = limiter.spawn_sweeper(DEFAULT_SWEEP_INTERVAL);
//!     let decision = limiter.check_action(Some("user-42"), Action::Login);
//!     if !decision.allowed {
//!         println!("try again in {}s", decision.retry_after_secs());
//!     }
//!     sweeper.stop().await;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod cache;
pub mod clock;
pub mod error;
pub mod fetch;
pub mod jitter;
pub mod prelude;
pub mod preload;
pub mod rate_limit;
pub mod region;
pub mod retry;
pub mod sleeper;
pub mod transport;

// Re-exports
pub use backoff::{Backoff, BackoffError, MAX_BACKOFF};
pub use cache::{RegionCache, RegionCacheConfig, RegionCacheConfigBuilder, DEFAULT_BASE_URL, DEFAULT_TTL};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{BuildError, ConfigError, FetchError, GuardError};
pub use fetch::RetryingFetcher;
pub use jitter::Jitter;
pub use preload::{ChainPreloader, RegionChain};
pub use rate_limit::{
    Action, Decision, RateLimitConfig, RateLimitLayer, RateLimitService, RateLimiter,
    SweeperHandle, ANONYMOUS_IDENTIFIER, DEFAULT_SWEEP_INTERVAL,
};
pub use region::{CacheKey, Level, Region};
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use transport::{HttpTransport, RawResponse, Transport};
