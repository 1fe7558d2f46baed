//! Worker configuration derived from [`AppConfig`].

use std::time::Duration;

use soluce_core::{AppConfig, CacheNames, Error};
use url::Url;

use crate::classify::RoutingTable;

/// Branding used for synthesized pages and default notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub name: String,
    pub icon: String,
}

/// Everything the worker's components need to know about their deployment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub cache_names: CacheNames,
    pub max_cache_age: Duration,
    pub max_dynamic_entries: usize,
    /// Upper bound on any single network attempt.
    pub network_timeout: Duration,
    pub routes: RoutingTable,
    pub precache: Vec<String>,
    pub app_shell: String,
    pub branding: Branding,
}

impl TryFrom<&AppConfig> for WorkerConfig {
    type Error = Error;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            origin,
            cache_names: config.cache_names(),
            max_cache_age: config.max_cache_age(),
            max_dynamic_entries: config.max_dynamic_entries,
            network_timeout: config.timeout(),
            routes: RoutingTable {
                network_first: config.network_first_routes.clone(),
                cache_first: config.cache_first_routes.clone(),
            },
            precache: config.precache.clone(),
            app_shell: config.app_shell.clone(),
            branding: Branding { name: config.brand_name.clone(), icon: config.brand_icon.clone() },
        })
    }
}

impl WorkerConfig {
    /// Defaults for the given origin.
    pub fn for_origin(origin: &str) -> Result<Self, Error> {
        let config = AppConfig { origin: origin.to_string(), ..Default::default() };
        Self::try_from(&config)
    }

    /// The app shell URL on this origin.
    pub fn app_shell_url(&self) -> Result<Url, Error> {
        self.origin
            .join(&self.app_shell)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.app_shell)))
    }
}
