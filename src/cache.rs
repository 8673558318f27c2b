//! TTL cache over the four region levels.
//!
//! Lookups are keyed by `(level, parent_code)`. A valid entry (younger than the TTL) is
//! served without touching the network; a miss or an expired entry is refetched through
//! the [`RetryingFetcher`] and replaced wholesale.
//!
//! [`RegionCache::try_get`] reports fetch failures as a typed error.
//! [`RegionCache::get`] is the boundary used by form code: it logs the failure and
//! degrades to an empty list, so callers always receive something renderable.
//!
//! Concurrent misses for the same key each fetch independently unless
//! [`RegionCacheConfigBuilder::single_flight`] is enabled, in which case later callers
//! wait for the in-flight fetch and are served from the entry it stored.

use crate::clock::{Clock, MonotonicClock};
use crate::error::{BuildError, FetchError};
use crate::fetch::RetryingFetcher;
use crate::region::{CacheKey, Level, Region, RegionEnvelope};
use crate::retry::{RetryPolicy, DEFAULT_RETRIES};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::transport::{HttpTransport, Transport, DEFAULT_REQUEST_TIMEOUT};
use crate::Backoff;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Public region API serving `/provinces.json`, `/regencies/{code}.json`, ...
pub const DEFAULT_BASE_URL: &str = "https://wilayah.id/api";
/// How long a fetched list is served before it is refetched.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
/// First backoff delay; doubled for each further retry.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
pub const DEFAULT_USER_AGENT: &str = concat!("regionkit/", env!("CARGO_PKG_VERSION"));

/// Validated configuration for a [`RegionCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCacheConfig {
    base_url: String,
    ttl: Duration,
    retries: usize,
    backoff_base: Duration,
    single_flight: bool,
    request_timeout: Duration,
    user_agent: String,
}

impl RegionCacheConfig {
    pub fn builder() -> RegionCacheConfigBuilder {
        RegionCacheConfigBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    pub fn single_flight(&self) -> bool {
        self.single_flight
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for RegionCacheConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl: DEFAULT_TTL,
            retries: DEFAULT_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            single_flight: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Builder for [`RegionCacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct RegionCacheConfigBuilder {
    config: RegionCacheConfig,
}

impl RegionCacheConfigBuilder {
    /// API root; a trailing `/` is dropped.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Retries after the first attempt.
    pub fn retries(mut self, retries: usize) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.config.backoff_base = base;
        self
    }

    /// Share one in-flight fetch between concurrent misses of the same key.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.config.single_flight = enabled;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<RegionCacheConfig, BuildError> {
        if self.config.base_url.trim().is_empty() {
            return Err(BuildError::EmptyBaseUrl);
        }
        Ok(self.config)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<[Region]>,
    stored_at_millis: u64,
}

impl CacheEntry {
    fn is_valid(&self, now_millis: u64, ttl: Duration) -> bool {
        u128::from(now_millis.saturating_sub(self.stored_at_millis)) < ttl.as_millis()
    }
}

/// Hierarchical region cache with retrying fetch.
#[derive(Debug)]
pub struct RegionCache {
    fetcher: RetryingFetcher,
    clock: Arc<dyn Clock>,
    base_url: String,
    ttl: Duration,
    single_flight: bool,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl RegionCache {
    /// Cache backed by reqwest, the tokio timer and a monotonic clock.
    pub fn new(config: RegionCacheConfig) -> Result<Self, BuildError> {
        let transport = HttpTransport::new(config.request_timeout, &config.user_agent)?;
        Self::from_parts(
            config,
            Arc::new(transport),
            Arc::new(MonotonicClock::default()),
            Arc::new(TokioSleeper),
        )
    }

    /// Cache over caller-supplied collaborators.
    pub fn from_parts(
        config: RegionCacheConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, BuildError> {
        let policy = RetryPolicy::builder()
            .retries(config.retries)
            .backoff(Backoff::exponential(config.backoff_base))
            .with_shared_sleeper(sleeper)
            .build()?;
        Ok(Self {
            fetcher: RetryingFetcher::new(transport, policy),
            clock,
            base_url: config.base_url,
            ttl: config.ttl,
            single_flight: config.single_flight,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Regions under `parent_code` at `level`. Never fails: fetch errors are logged and
    /// yield an empty list.
    pub async fn get(&self, level: Level, parent_code: Option<&str>) -> Vec<Region> {
        match self.try_get(level, parent_code).await {
            Ok(regions) => regions.to_vec(),
            Err(err) => {
                tracing::warn!(%level, parent = ?parent_code, error = %err, "region lookup failed");
                Vec::new()
            }
        }
    }

    /// Like [`get`](Self::get) but reports fetch failures.
    ///
    /// A non-province level without a parent code resolves to an empty list without
    /// consulting the cache or the network.
    pub async fn try_get(
        &self,
        level: Level,
        parent_code: Option<&str>,
    ) -> Result<Arc<[Region]>, FetchError> {
        let Some(key) = CacheKey::new(level, parent_code) else {
            return Ok(Arc::from(Vec::new()));
        };

        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        if !self.single_flight {
            return self.fetch_and_store(&key).await;
        }

        let gate = self.gate(&key);
        let _turn = gate.lock().await;
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        self.fetch_and_store(&key).await
    }

    pub async fn provinces(&self) -> Vec<Region> {
        self.get(Level::Province, None).await
    }

    pub async fn regencies(&self, province_code: &str) -> Vec<Region> {
        self.get(Level::Regency, Some(province_code)).await
    }

    pub async fn districts(&self, regency_code: &str) -> Vec<Region> {
        self.get(Level::District, Some(regency_code)).await
    }

    pub async fn villages(&self, district_code: &str) -> Vec<Region> {
        self.get(Level::Village, Some(district_code)).await
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().expect("region cache poisoned").clear();
        self.in_flight.lock().expect("region cache poisoned").clear();
        tracing::debug!("region cache cleared");
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, level: Level, parent_code: Option<&str>) -> bool {
        let Some(key) = CacheKey::new(level, parent_code) else {
            return false;
        };
        self.entries.write().expect("region cache poisoned").remove(&key).is_some()
    }

    /// Drop entries older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().expect("region cache poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now, self.ttl));
        before - entries.len()
    }

    /// When the entry for this key was stored, if any (expired or not).
    pub fn stored_at_millis(&self, level: Level, parent_code: Option<&str>) -> Option<u64> {
        let key = CacheKey::new(level, parent_code)?;
        self.entries.read().expect("region cache poisoned").get(&key).map(|e| e.stored_at_millis)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("region cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<[Region]>> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().expect("region cache poisoned");
        match entries.get(key) {
            Some(entry) if entry.is_valid(now, self.ttl) => {
                tracing::debug!(%key, "region cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                tracing::debug!(%key, "region cache entry expired");
                None
            }
            None => {
                tracing::debug!(%key, "region cache miss");
                None
            }
        }
    }

    async fn fetch_and_store(&self, key: &CacheKey) -> Result<Arc<[Region]>, FetchError> {
        let url = format!("{}{}", self.base_url, key.path());
        let envelope: RegionEnvelope = self.fetcher.fetch(&url).await?;
        let data: Arc<[Region]> = Arc::from(envelope.data);
        let entry = CacheEntry { data: data.clone(), stored_at_millis: self.clock.now_millis() };
        self.entries.write().expect("region cache poisoned").insert(key.clone(), entry);
        tracing::debug!(%key, count = data.len(), "region list cached");
        Ok(data)
    }

    fn gate(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .expect("region cache poisoned")
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
