//! Freshness policy: which requests bypass the cache.

use swcache_core::AppConfig;
use swcache_core::config::DEFAULT_NO_CACHE_PATHS;

/// Policy applied to one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always go to the network; the store is only a fallback when offline.
    NetworkFirst,
    /// Serve from the store when present, otherwise fetch and store.
    CacheFirst,
}

/// Ordered set of path fragments that must always be network-fresh.
///
/// Matching is case-sensitive against the URL path only. A path is a
/// member when it ends with, or contains, any fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoCachePaths {
    fragments: Vec<String>,
}

impl NoCachePaths {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fragments: fragments.into_iter().map(Into::into).collect() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.no_cache_paths.iter().cloned())
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Whether `path` belongs to the set.
    pub fn matches(&self, path: &str) -> bool {
        self.fragments
            .iter()
            .any(|fragment| path.ends_with(fragment.as_str()) || path.contains(fragment.as_str()))
    }

    pub fn strategy_for(&self, path: &str) -> Strategy {
        if self.matches(path) { Strategy::NetworkFirst } else { Strategy::CacheFirst }
    }
}

impl Default for NoCachePaths {
    fn default() -> Self {
        Self::new(DEFAULT_NO_CACHE_PATHS.iter().copied())
    }
}
