//! Source record operations.

use super::connection::{ThumbsDb, encode_ts, ts_column};
use crate::Error;
use crate::models::{FileDefaults, Source, SourceCriteria};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

fn source_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source { id: row.get(0)?, storage_hash: row.get(1)?, name: row.get(2)?, modified: ts_column(row, 3)? })
}

fn select_source(conn: &rusqlite::Connection, criteria: &SourceCriteria) -> rusqlite::Result<Option<Source>> {
    conn.query_row(
        "SELECT id, storage_hash, name, modified FROM sources WHERE storage_hash = ?1 AND name = ?2",
        params![criteria.storage_hash, criteria.name],
        source_row,
    )
    .optional()
}

impl ThumbsDb {
    /// Fetch the source matching `criteria`, inserting it first if absent.
    ///
    /// The insert and the read happen in one connection call; the UNIQUE
    /// constraint decides the winner when several processes race. Returns
    /// the record and whether this call created it.
    pub async fn source_get_or_create(
        &self, criteria: &SourceCriteria, defaults: FileDefaults,
    ) -> Result<(Source, bool), Error> {
        let criteria = criteria.clone();
        let modified = encode_ts(&defaults.modified_or_now());
        self.conn
            .call(move |conn| -> Result<(Source, bool), Error> {
                let inserted = conn.execute(
                    "INSERT INTO sources (storage_hash, name, modified) VALUES (?1, ?2, ?3)
                     ON CONFLICT(storage_hash, name) DO NOTHING",
                    params![criteria.storage_hash, criteria.name, modified],
                )?;
                let source = select_source(conn, &criteria)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                Ok((source, inserted == 1))
            })
            .await
            .map_err(Error::from)
    }

    /// Get a source by its unique fields.
    ///
    /// Returns None if no row matches.
    pub async fn source_find(&self, criteria: &SourceCriteria) -> Result<Option<Source>, Error> {
        let criteria = criteria.clone();
        self.conn
            .call(move |conn| -> Result<Option<Source>, Error> { Ok(select_source(conn, &criteria)?) })
            .await
            .map_err(Error::from)
    }

    /// Delete a source. Its thumbnails and their dimensions go with it.
    ///
    /// Returns the number of deleted sources (0 or 1).
    pub async fn delete_source(&self, id: i64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM sources WHERE id = ?1", params![id])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_sources(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn criteria(name: &str) -> SourceCriteria {
        SourceCriteria { storage_hash: "storage-a".to_string(), name: name.to_string() }
    }

    #[tokio::test]
    async fn test_get_or_create_then_fetch() {
        let db = ThumbsDb::open_in_memory().await.unwrap();

        let (created, was_created) = db.source_get_or_create(&criteria("img.png"), FileDefaults::default()).await.unwrap();
        assert!(was_created);

        let (fetched, was_created) = db.source_get_or_create(&criteria("img.png"), FileDefaults::default()).await.unwrap();
        assert!(!was_created);
        assert_eq!(fetched, created);
        assert_eq!(db.count_sources().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_defaults_only_apply_on_insert() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let (source, _) = db
            .source_get_or_create(&criteria("a.jpg"), FileDefaults { modified: Some(first) })
            .await
            .unwrap();
        assert_eq!(source.modified, first);

        let (source, _) = db
            .source_get_or_create(&criteria("a.jpg"), FileDefaults { modified: Some(second) })
            .await
            .unwrap();
        assert_eq!(source.modified, first);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        assert!(db.source_find(&criteria("nope.png")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_name_different_storage() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let other = SourceCriteria { storage_hash: "storage-b".to_string(), name: "img.png".to_string() };

        let (a, _) = db.source_get_or_create(&criteria("img.png"), FileDefaults::default()).await.unwrap();
        let (b, _) = db.source_get_or_create(&other, FileDefaults::default()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
