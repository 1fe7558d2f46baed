//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SOLUCE_SW_*)
//! 2. TOML config file (if SOLUCE_SW_CONFIG_FILE set)
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

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SOLUCE_SW_*)
/// 2. TOML config file (if SOLUCE_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker serves; relative request and precache URLs resolve against it.
    ///
    /// Set via SOLUCE_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every cache partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Worker version suffixed to partition names. Bumping it invalidates
    /// every partition of the previous deployment on activation.
    ///
    /// Set via SOLUCE_SW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SOLUCE_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds.
    ///
    /// Set via SOLUCE_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Age after which a cached static asset is revalidated against the network.
    #[serde(default = "default_max_cache_age_secs")]
    pub max_cache_age_secs: u64,

    /// Entry cap for the dynamic partition.
    #[serde(default = "default_max_dynamic_entries")]
    pub max_dynamic_entries: usize,

    /// URLs fetched and stored in the static partition at install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path prefixes always served network-first.
    #[serde(default = "default_network_first_routes")]
    pub network_first_routes: Vec<String>,

    /// Marketing routes earmarked for cache-first serving.
    ///
    /// Loaded and validated, but not consulted when classifying requests.
    #[serde(default = "default_cache_first_routes")]
    pub cache_first_routes: Vec<String>,

    /// Document served to navigations when the network is down.
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// Title used for notifications that do not carry their own.
    #[serde(default = "default_brand_name")]
    pub brand_name: String,

    /// Icon and badge used for notifications that do not carry their own.
    #[serde(default = "default_brand_icon")]
    pub brand_icon: String,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "cybersoluce".into()
}

fn default_version() -> String {
    "v1.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./soluce-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "soluce-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_max_cache_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_dynamic_entries() -> usize {
    50
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/cybersoluce.png",
        "/src/main.tsx",
        "/src/App.tsx",
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&display=swap",
        "https://fonts.googleapis.com/css2?family=Outfit:wght@400;500;600;700&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_first_routes() -> Vec<String> {
    ["/api/", "/assessment", "/dashboard"].into_iter().map(String::from).collect()
}

fn default_cache_first_routes() -> Vec<String> {
    ["/about", "/pricing", "/contact", "/security", "/platform"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_app_shell() -> String {
    "/index.html".into()
}

fn default_brand_name() -> String {
    "CyberSoluce".into()
}

fn default_brand_icon() -> String {
    "/cybersoluce.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_cache_age_secs: default_max_cache_age_secs(),
            max_dynamic_entries: default_max_dynamic_entries(),
            precache: default_precache(),
            network_first_routes: default_network_first_routes(),
            cache_first_routes: default_cache_first_routes(),
            app_shell: default_app_shell(),
            brand_name: default_brand_name(),
            brand_icon: default_brand_icon(),
        }
    }
}

/// Names of the three partitions owned by one worker version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    /// Legacy umbrella partition.
    pub general: String,
    /// Precached shell and static assets.
    pub static_assets: String,
    /// API and generic runtime responses, size-capped.
    pub dynamic: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            general: format!("{prefix}-{version}"),
            static_assets: format!("{prefix}-static-{version}"),
            dynamic: format!("{prefix}-dynamic-{version}"),
        }
    }

    /// Partition names that survive activation.
    pub fn keep_set(&self) -> Vec<String> {
        vec![self.general.clone(), self.static_assets.clone(), self.dynamic.clone()]
    }

    pub fn contains(&self, name: &str) -> bool {
        name == self.general || name == self.static_assets || name == self.dynamic
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Freshness window for cached static assets.
    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.max_cache_age_secs)
    }

    /// Partition names for the configured prefix and version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SOLUCE_SW_`
    /// 2. TOML file from `SOLUCE_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SOLUCE_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SOLUCE_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:5173");
        assert_eq!(config.db_path, PathBuf::from("./soluce-sw-cache.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_cache_age_secs, 604_800);
        assert_eq!(config.max_dynamic_entries, 50);
        assert_eq!(config.precache.len(), 8);
        assert_eq!(config.network_first_routes, vec!["/api/", "/assessment", "/dashboard"]);
        assert_eq!(config.cache_first_routes.len(), 5);
        assert_eq!(config.app_shell, "/index.html");
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.max_cache_age(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_cache_names() {
        let names = AppConfig::default().cache_names();
        assert_eq!(names.general, "cybersoluce-v1.0.0");
        assert_eq!(names.static_assets, "cybersoluce-static-v1.0.0");
        assert_eq!(names.dynamic, "cybersoluce-dynamic-v1.0.0");
        assert!(names.contains("cybersoluce-dynamic-v1.0.0"));
        assert!(!names.contains("cybersoluce-dynamic-v0.9.0"));
        assert_eq!(names.keep_set().len(), 3);
    }

    #[test]
    fn test_load_layers_env_over_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("soluce.toml", "version = \"v2.0.0\"\nmax_dynamic_entries = 10\n")?;
            jail.set_env("SOLUCE_SW_CONFIG_FILE", "soluce.toml");
            jail.set_env("SOLUCE_SW_MAX_DYNAMIC_ENTRIES", "20");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.version, "v2.0.0");
            assert_eq!(config.max_dynamic_entries, 20);
            assert_eq!(config.cache_names().static_assets, "cybersoluce-static-v2.0.0");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SOLUCE_SW_TIMEOUT_MS", "5");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
