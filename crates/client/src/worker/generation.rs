//! Cache generation identifiers.

use swcache_core::AppConfig;

/// Deploy-time version tag and the store name derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    version: String,
    cache_name: String,
}

impl Generation {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { version: version.to_string(), cache_name: format!("{prefix}{version}") }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.cache_prefix, &config.cache_version)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the store owned by this generation.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Whether a store with this name belongs to this generation.
    pub fn owns(&self, store_name: &str) -> bool {
        self.cache_name == store_name
    }
}
