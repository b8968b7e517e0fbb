//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application files that must always be fetched fresh.
pub const DEFAULT_NO_CACHE_PATHS: &[&str] = &[
    "/css/main.css",
    "/js/dashboard.js",
    "/js/api.js",
    "/js/auth.js",
    "/dashboard.html",
    "/actions.html",
    "/admin.html",
    "/js/components/ActionsList.js",
    "/js/components/PhotoManager.js",
    "/js/components/ActionForm.js",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database backing every cache store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application the worker is scoped to.
    ///
    /// Responses from this origin are "basic" and may be stored; anything
    /// else is cross-origin. Set via SWCACHE_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cache generation identifier, bumped on every deploy.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Prefix prepended to the version to name the current store.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Path fragments that are always fetched from the network.
    ///
    /// Set via SWCACHE_NO_CACHE_PATHS (comma-separated) or a TOML array.
    #[serde(default = "default_no_cache_paths")]
    pub no_cache_paths: Vec<String>,

    /// User-Agent string for outgoing requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Optional request timeout in milliseconds.
    ///
    /// Unset by default: a slow origin stalls the request rather than
    /// being masked by a synthetic failure.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_version() -> String {
    "gmao-v2025-06-04-hotfix".into()
}

fn default_cache_prefix() -> String {
    "gmao-cache-".into()
}

fn default_no_cache_paths() -> Vec<String> {
    DEFAULT_NO_CACHE_PATHS.iter().map(|p| p.to_string()).collect()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_version: default_cache_version(),
            cache_prefix: default_cache_prefix(),
            no_cache_paths: default_no_cache_paths(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Name of the cache store belonging to the configured generation.
    pub fn cache_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE", "NO_CACHE_PATHS"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if let Ok(paths) = std::env::var("SWCACHE_NO_CACHE_PATHS") {
            config.no_cache_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        config.validate()?;

        Ok(config)
    }
}
