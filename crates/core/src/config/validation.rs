//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `cache_prefix`, `version` or `user_agent` is empty
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `max_cache_age_secs` or `max_dynamic_entries` is 0
    /// - a route prefix or the app shell does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin_ok = url::Url::parse(&self.origin)
            .is_ok_and(|origin| matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some());
        if !origin_ok {
            return Err(invalid("origin", "must be an absolute http(s) URL"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.max_cache_age_secs == 0 {
            return Err(invalid("max_cache_age_secs", "must be greater than 0"));
        }
        if self.max_dynamic_entries == 0 {
            return Err(invalid("max_dynamic_entries", "must be greater than 0"));
        }

        if !self.app_shell.starts_with('/') {
            return Err(invalid("app_shell", "must be an absolute path"));
        }
        if self.network_first_routes.iter().any(|r| !r.starts_with('/')) {
            return Err(invalid("network_first_routes", "every route must start with '/'"));
        }
        if self.cache_first_routes.iter().any(|r| !r.starts_with('/')) {
            return Err(invalid("cache_first_routes", "every route must start with '/'"));
        }

        if self.precache.is_empty() {
            tracing::warn!("precache list is empty; offline navigations will only get the fallback page");
        }

        Ok(())
    }
}
