//! Prefill the four region dropdowns of an address form in one round.

use crate::cache::RegionCache;
use crate::region::{Level, Region};

/// Option lists for every level of a previously chosen address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionChain {
    pub provinces: Vec<Region>,
    pub regencies: Vec<Region>,
    pub districts: Vec<Region>,
    pub villages: Vec<Region>,
}

impl RegionChain {
    /// Lists in hierarchy order: provinces, regencies, districts, villages.
    pub fn into_lists(self) -> [Vec<Region>; 4] {
        [self.provinces, self.regencies, self.districts, self.villages]
    }

    pub fn list(&self, level: Level) -> &[Region] {
        match level {
            Level::Province => &self.provinces,
            Level::Regency => &self.regencies,
            Level::District => &self.districts,
            Level::Village => &self.villages,
        }
    }
}

/// Fans four lookups out over a [`RegionCache`] and joins them.
#[derive(Debug, Clone, Copy)]
pub struct ChainPreloader<'a> {
    cache: &'a RegionCache,
}

impl<'a> ChainPreloader<'a> {
    pub fn new(cache: &'a RegionCache) -> Self {
        Self { cache }
    }

    /// Provinces are always loaded; each lower level only when the code above it is
    /// non-empty. Codes are not checked against each other.
    pub async fn preload(
        &self,
        province_code: &str,
        regency_code: &str,
        district_code: &str,
    ) -> RegionChain {
        let (provinces, regencies, districts, villages) = tokio::join!(
            self.cache.provinces(),
            self.children(Level::Regency, province_code),
            self.children(Level::District, regency_code),
            self.children(Level::Village, district_code),
        );
        tracing::debug!(
            provinces = provinces.len(),
            regencies = regencies.len(),
            districts = districts.len(),
            villages = villages.len(),
            "address chain preloaded"
        );
        RegionChain { provinces, regencies, districts, villages }
    }

    async fn children(&self, level: Level, parent_code: &str) -> Vec<Region> {
        if parent_code.is_empty() {
            return Vec::new();
        }
        self.cache.get(level, Some(parent_code)).await
    }
}

impl RegionCache {
    /// Shorthand for [`ChainPreloader::preload`].
    pub async fn preload(
        &self,
        province_code: &str,
        regency_code: &str,
        district_code: &str,
    ) -> RegionChain {
        ChainPreloader::new(self).preload(province_code, regency_code, district_code).await
    }
}
