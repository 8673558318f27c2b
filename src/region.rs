//! Administrative region hierarchy: province → regency → district → village.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One administrative unit at some level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

impl Region {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self { code: code.into(), name: name.into() }
    }
}

/// Level of the four-tier hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Province,
    Regency,
    District,
    Village,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Province, Level::Regency, Level::District, Level::Village];

    /// Only the top level can be listed without a parent code.
    pub fn requires_parent(self) -> bool {
        self != Level::Province
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Province => None,
            Level::Regency => Some(Level::Province),
            Level::District => Some(Level::Regency),
            Level::Village => Some(Level::District),
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Province => Some(Level::Regency),
            Level::Regency => Some(Level::District),
            Level::District => Some(Level::Village),
            Level::Village => None,
        }
    }

    /// Plural path segment used by the region API.
    pub fn collection(self) -> &'static str {
        match self {
            Level::Province => "provinces",
            Level::Regency => "regencies",
            Level::District => "districts",
            Level::Village => "villages",
        }
    }

    /// Endpoint path relative to the API base: `/provinces.json`, `/regencies/11.json`, ...
    pub fn path(self, parent_code: Option<&str>) -> String {
        match parent_code {
            Some(code) if self.requires_parent() => format!("/{}/{}.json", self.collection(), code),
            _ => format!("/{}.json", self.collection()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Province => "province",
            Level::Regency => "regency",
            Level::District => "district",
            Level::Village => "village",
        };
        f.write_str(name)
    }
}

/// Cache key derived from `(level, parent_code)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    level: Level,
    parent_code: Option<String>,
}

impl CacheKey {
    /// Returns `None` when a non-province level has no usable parent code.
    pub fn new(level: Level, parent_code: Option<&str>) -> Option<Self> {
        if !level.requires_parent() {
            return Some(Self { level, parent_code: None });
        }
        match parent_code {
            Some(code) if !code.trim().is_empty() => {
                Some(Self { level, parent_code: Some(code.trim().to_string()) })
            }
            _ => None,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }

    pub fn path(&self) -> String {
        self.level.path(self.parent_code())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent_code {
            Some(code) => write!(f, "{}:{}", self.level.collection(), code),
            None => f.write_str(self.level.collection()),
        }
    }
}

/// Response shape shared by all four endpoints. `meta` is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RegionEnvelope {
    #[serde(default)]
    pub data: Vec<Region>,
}
