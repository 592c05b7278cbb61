//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (THUMBS_*, `__` separates nested keys)
//! 2. TOML config file (if THUMBS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// A named cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CacheBackendConfig {
    /// Process-local bounded map. Entries are lost on restart.
    Memory {
        #[serde(default = "default_max_entries")]
        max_entries: u64,
    },
    /// Key/value table in a SQLite file, shareable between processes.
    Sqlite { path: PathBuf },
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (THUMBS_*)
/// 2. TOML config file (if THUMBS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite record store.
    ///
    /// Set via THUMBS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory of the filesystem storage that names resolve against.
    ///
    /// Set via THUMBS_MEDIA_ROOT environment variable.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Name of the entry in `caches` to use. Unset disables caching.
    ///
    /// Set via THUMBS_CACHE environment variable.
    #[serde(default)]
    pub cache: Option<String>,

    /// Available cache backends by name.
    #[serde(default = "default_caches")]
    pub caches: BTreeMap<String, CacheBackendConfig>,

    /// Cache resolved records (only meaningful when `cache` is set).
    ///
    /// Set via THUMBS_QUERYSET_CACHING environment variable.
    #[serde(default = "default_true")]
    pub queryset_caching: bool,

    /// Load thumbnail dimensions together with the thumbnail.
    ///
    /// Set via THUMBS_CACHE_DIMENSIONS environment variable.
    #[serde(default)]
    pub cache_dimensions: bool,

    /// Overrides the version tag that namespaces cache keys.
    ///
    /// Set via THUMBS_VERSION_TAG environment variable.
    #[serde(default)]
    pub version_tag: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./thumbs.sqlite")
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_max_entries() -> u64 {
    crate::cache::memory::DEFAULT_MAX_ENTRIES
}

fn default_caches() -> BTreeMap<String, CacheBackendConfig> {
    BTreeMap::from([("default".to_string(), CacheBackendConfig::Memory { max_entries: default_max_entries() })])
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            media_root: default_media_root(),
            cache: None,
            caches: default_caches(),
            queryset_caching: true,
            cache_dimensions: false,
            version_tag: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `THUMBS_`
    /// 2. TOML file from `THUMBS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("THUMBS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("THUMBS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The configured cache backend, if caching is turned on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `cache` names an unknown backend.
    pub fn selected_cache(&self) -> Result<Option<(&str, &CacheBackendConfig)>, ConfigError> {
        let Some(name) = self.cache.as_deref() else {
            return Ok(None);
        };
        self.caches
            .get(name)
            .map(|backend| Some((name, backend)))
            .ok_or_else(|| ConfigError::Invalid {
                field: "cache".into(),
                reason: format!("the cache {name:?} doesn't seem to exist in `caches`"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./thumbs.sqlite"));
        assert_eq!(config.media_root, PathBuf::from("./media"));
        assert!(config.cache.is_none());
        assert_eq!(config.caches.get("default"), Some(&CacheBackendConfig::Memory { max_entries: 300 }));
        assert!(config.queryset_caching);
        assert!(!config.cache_dimensions);
        assert!(config.version_tag.is_none());
    }

    #[test]
    fn test_selected_cache_disabled() {
        let config = AppConfig::default();
        assert!(config.selected_cache().unwrap().is_none());
    }

    #[test]
    fn test_selected_cache_known() {
        let config = AppConfig { cache: Some("default".into()), ..Default::default() };
        let (name, backend) = config.selected_cache().unwrap().unwrap();
        assert_eq!(name, "default");
        assert_eq!(backend, &CacheBackendConfig::Memory { max_entries: 300 });
    }

    #[test]
    fn test_selected_cache_unknown() {
        let config = AppConfig { cache: Some("redis".into()), ..Default::default() };
        assert!(matches!(config.selected_cache(), Err(ConfigError::Invalid { field, .. }) if field == "cache"));
    }

    #[test]
    fn test_load_from_env_and_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "thumbs.toml",
                r#"
                cache = "shared"
                cache_dimensions = true

                [caches.shared]
                backend = "sqlite"
                path = "cache.sqlite"
                "#,
            )?;
            jail.set_env("THUMBS_CONFIG_FILE", "thumbs.toml");
            jail.set_env("THUMBS_QUERYSET_CACHING", "false");
            jail.set_env("THUMBS_DB_PATH", "records.sqlite");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache.as_deref(), Some("shared"));
            assert_eq!(
                config.caches.get("shared"),
                Some(&CacheBackendConfig::Sqlite { path: PathBuf::from("cache.sqlite") })
            );
            assert!(config.caches.contains_key("default"));
            assert!(config.cache_dimensions);
            assert!(!config.queryset_caching);
            assert_eq!(config.db_path, PathBuf::from("records.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_load_memory_max_entries() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "thumbs.toml",
                r#"
                cache = "small"

                [caches.small]
                backend = "memory"
                max_entries = 10

                [caches.plain]
                backend = "memory"
                "#,
            )?;
            jail.set_env("THUMBS_CONFIG_FILE", "thumbs.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.caches.get("small"), Some(&CacheBackendConfig::Memory { max_entries: 10 }));
            assert_eq!(config.caches.get("plain"), Some(&CacheBackendConfig::Memory { max_entries: 300 }));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_unknown_cache() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("THUMBS_CACHE", "missing");
            assert!(AppConfig::load().is_err());
            Ok(())
        });
    }
}
