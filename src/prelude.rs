//! Convenient re-exports for common regionkit types.
pub use crate::{
    cache::{RegionCache, RegionCacheConfig},
    error::{FetchError, GuardError},
    preload::{ChainPreloader, RegionChain},
    rate_limit::{Action, Decision, RateLimitConfig, RateLimitLayer, RateLimiter, SweeperHandle},
    region::{Level, Region},
    retry::RetryPolicy,
    Backoff, Jitter,
};
