//! Configuration validation rules.
//!
//! Runs after `AppConfig` has been loaded so misconfiguration surfaces at
//! startup rather than on the first lookup.

use crate::config::{AppConfig, CacheBackendConfig};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("cache {name:?} is unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache` names a backend missing from `caches`
    /// - a memory cache has `max_entries = 0`
    /// - a sqlite cache has an empty `path`
    /// - `version_tag` is empty or contains `:`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.selected_cache()?;

        for (name, backend) in &self.caches {
            match backend {
                CacheBackendConfig::Memory { max_entries: 0 } => {
                    return Err(ConfigError::Invalid {
                        field: format!("caches.{name}.max_entries"),
                        reason: "must be greater than 0".into(),
                    });
                }
                CacheBackendConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                    return Err(ConfigError::Invalid {
                        field: format!("caches.{name}.path"),
                        reason: "must not be empty".into(),
                    });
                }
                _ => {}
            }
        }

        if let Some(tag) = &self.version_tag {
            if tag.is_empty() {
                return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not be empty".into() });
            }
            if tag.contains(':') {
                return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not contain ':'".into() });
            }
        }

        if self.cache.is_some() && !self.queryset_caching {
            tracing::warn!(
                cache = self.cache.as_deref(),
                "A cache is configured but queryset_caching is off; records will not be cached"
            );
        }

        Ok(())
    }
}
