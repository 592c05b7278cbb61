//! SQLite key/value cache backend.
//!
//! Lets several processes on one host share cached records through a file.

use std::path::Path;
use std::time::Duration;

use crate::Error;
use crate::store::connection::encode_ts;
use chrono::Utc;
use tokio_rusqlite::rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};

const SCHEMA: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        stored_at TEXT NOT NULL,
        expires_at TEXT
     );
     CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at);";

/// Cache handle backed by a `cache_entries` table.
#[derive(Clone, Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open (or create) the cache file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;
        Ok(Self { conn })
    }

    /// Get a live entry by key.
    ///
    /// Returns None if the key doesn't exist or has expired.
    pub async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        let now = encode_ts(&Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let value = conn
                    .query_row(
                        "SELECT value FROM cache_entries
                         WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                        params![key, now],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry. `None` never expires.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let stored_at = Utc::now();
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| encode_ts(&(stored_at + ttl)));
        let stored_at = encode_ts(&stored_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, stored_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![key, value, stored_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Returns true if an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = encode_ts(&Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at < ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = SqliteCache::open_in_memory().await.unwrap();
        cache.set("k", r#"{"id":1}"#, None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(r#"{"id":1}"#));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = SqliteCache::open_in_memory().await.unwrap();
        assert!(cache.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert() {
        let cache = SqliteCache::open_in_memory().await.unwrap();
        cache.set("k", "old", None).await.unwrap();
        cache.set("k", "new", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = SqliteCache::open_in_memory().await.unwrap();
        cache.set("k", "v", None).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_and_purge() {
        let cache = SqliteCache::open_in_memory().await.unwrap();
        cache.set("expiring", "v", Some(Duration::from_secs(1))).await.unwrap();
        cache.set("forever", "v", None).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(cache.get("expiring").await.unwrap().is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert!(cache.get("forever").await.unwrap().is_some());
    }
}
