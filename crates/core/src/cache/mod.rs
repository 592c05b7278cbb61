//! Record cache used in front of the record store.
//!
//! The cache is best effort: a missing or stale entry only costs a store
//! round-trip. Backends:
//!
//! - `Disabled`: every lookup misses, writes are dropped
//! - `Memory`: process-local bounded map
//! - `Sqlite`: key/value table in a shared file

pub mod key;
pub mod memory;
pub mod sqlite;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Error;
use crate::config::{AppConfig, CacheBackendConfig, ConfigError};

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Handle to the configured cache backend.
///
/// Build it once at startup with [`CacheClient::from_config`] and hand
/// clones to whoever needs it; clones share the same backing store.
#[derive(Debug, Clone, Default)]
pub enum CacheClient {
    #[default]
    Disabled,
    Memory(MemoryCache),
    Sqlite(SqliteCache),
}

impl CacheClient {
    /// Build the cache named by `config.cache`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the named cache does not exist or its
    /// backend cannot be opened.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let Some((name, backend)) = config.selected_cache()? else {
            tracing::info!("record caching disabled");
            return Ok(Self::Disabled);
        };

        let client = match backend {
            CacheBackendConfig::Memory { max_entries } => Self::Memory(MemoryCache::with_max_entries(*max_entries)),
            CacheBackendConfig::Sqlite { path } => {
                let cache = SqliteCache::open(path)
                    .await
                    .map_err(|e| ConfigError::Unavailable { name: name.to_string(), reason: e.to_string() })?;
                Self::Sqlite(cache)
            }
        };
        tracing::info!(cache = name, backend = client.backend_name(), "record cache ready");
        Ok(client)
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match self {
            Self::Disabled => Ok(None),
            Self::Memory(cache) => Ok(cache.get(key)),
            Self::Sqlite(cache) => cache.get(key).await,
        }
    }

    /// Store `value` under `key`. A `ttl` of `None` means no expiry.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error> {
        match self {
            Self::Disabled => Ok(()),
            Self::Memory(cache) => {
                cache.set(key, value, ttl);
                Ok(())
            }
            Self::Sqlite(cache) => cache.set(key, value, ttl).await,
        }
    }

    /// Returns true if an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        match self {
            Self::Disabled => Ok(false),
            Self::Memory(cache) => Ok(cache.delete(key)),
            Self::Sqlite(cache) => cache.delete(key).await,
        }
    }

    /// Get and decode a JSON value.
    ///
    /// An entry that no longer decodes (e.g. written by an older build that
    /// shared the version tag) is dropped and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                self.delete(key).await?;
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl).await
    }
}
