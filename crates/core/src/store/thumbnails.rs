//! Thumbnail and thumbnail dimension operations.

use super::connection::{ThumbsDb, encode_ts, ts_column};
use crate::Error;
use crate::models::{FileDefaults, Thumbnail, ThumbnailCriteria, ThumbnailDimensions};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

const SELECT_THUMBNAIL: &str = "SELECT t.id, t.storage_hash, t.name, t.modified, t.source_id,
        d.thumbnail_id, d.width, d.height
    FROM thumbnails t
    LEFT JOIN thumbnail_dimensions d ON d.thumbnail_id = t.id";

fn thumbnail_row(row: &rusqlite::Row<'_>, with_dimensions: bool) -> rusqlite::Result<Thumbnail> {
    let dimensions = if with_dimensions {
        row.get::<_, Option<i64>>(5)?.map(|thumbnail_id| -> rusqlite::Result<ThumbnailDimensions> {
            Ok(ThumbnailDimensions { thumbnail_id, width: row.get(6)?, height: row.get(7)? })
        })
    } else {
        None
    };

    Ok(Thumbnail {
        id: row.get(0)?,
        storage_hash: row.get(1)?,
        name: row.get(2)?,
        modified: ts_column(row, 3)?,
        source_id: row.get(4)?,
        dimensions: dimensions.transpose()?,
    })
}

fn select_thumbnail(
    conn: &rusqlite::Connection, criteria: &ThumbnailCriteria, with_dimensions: bool,
) -> rusqlite::Result<Option<Thumbnail>> {
    conn.query_row(
        &format!("{SELECT_THUMBNAIL} WHERE t.storage_hash = ?1 AND t.name = ?2 AND t.source_id = ?3"),
        params![criteria.storage_hash, criteria.name, criteria.source_id],
        |row| thumbnail_row(row, with_dimensions),
    )
    .optional()
}

impl ThumbsDb {
    /// Fetch the thumbnail matching `criteria`, inserting it first if absent.
    ///
    /// Returns the record and whether this call created it. Freshly created
    /// thumbnails never carry dimensions.
    pub async fn thumbnail_get_or_create(
        &self, criteria: &ThumbnailCriteria, defaults: FileDefaults,
    ) -> Result<(Thumbnail, bool), Error> {
        let criteria = criteria.clone();
        let modified = encode_ts(&defaults.modified_or_now());
        self.conn
            .call(move |conn| -> Result<(Thumbnail, bool), Error> {
                let inserted = conn.execute(
                    "INSERT INTO thumbnails (storage_hash, name, modified, source_id) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(storage_hash, name, source_id) DO NOTHING",
                    params![criteria.storage_hash, criteria.name, modified, criteria.source_id],
                )?;
                let thumbnail =
                    select_thumbnail(conn, &criteria, false)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                Ok((thumbnail, inserted == 1))
            })
            .await
            .map_err(Error::from)
    }

    /// Get a thumbnail by its unique fields, optionally loading its dimensions.
    pub async fn thumbnail_find(
        &self, criteria: &ThumbnailCriteria, with_dimensions: bool,
    ) -> Result<Option<Thumbnail>, Error> {
        let criteria = criteria.clone();
        self.conn
            .call(move |conn| -> Result<Option<Thumbnail>, Error> {
                Ok(select_thumbnail(conn, &criteria, with_dimensions)?)
            })
            .await
            .map_err(Error::from)
    }

    /// All thumbnails generated from a source, by name.
    pub async fn thumbnails_for_source(&self, source_id: i64) -> Result<Vec<Thumbnail>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<Thumbnail>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_THUMBNAIL} WHERE t.source_id = ?1 ORDER BY t.name"))?;
                let rows = stmt.query_map(params![source_id], |row| thumbnail_row(row, true))?;
                let thumbnails = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(thumbnails)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_thumbnails(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM thumbnails", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Record the pixel size of a thumbnail.
    ///
    /// Uses UPSERT semantics: a thumbnail has at most one dimensions row.
    pub async fn set_dimensions(
        &self, thumbnail_id: i64, width: Option<u32>, height: Option<u32>,
    ) -> Result<ThumbnailDimensions, Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO thumbnail_dimensions (thumbnail_id, width, height) VALUES (?1, ?2, ?3)
                     ON CONFLICT(thumbnail_id) DO UPDATE SET
                        width = excluded.width,
                        height = excluded.height",
                    params![thumbnail_id, width, height],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(ThumbnailDimensions { thumbnail_id, width, height })
    }

    pub async fn get_dimensions(&self, thumbnail_id: i64) -> Result<Option<ThumbnailDimensions>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<ThumbnailDimensions>, Error> {
                let dims = conn
                    .query_row(
                        "SELECT thumbnail_id, width, height FROM thumbnail_dimensions WHERE thumbnail_id = ?1",
                        params![thumbnail_id],
                        |row| Ok(ThumbnailDimensions { thumbnail_id: row.get(0)?, width: row.get(1)?, height: row.get(2)? }),
                    )
                    .optional()?;
                Ok(dims)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Source, SourceCriteria};

    async fn seed_source(db: &ThumbsDb, name: &str) -> Source {
        let criteria = SourceCriteria { storage_hash: "storage-a".to_string(), name: name.to_string() };
        db.source_get_or_create(&criteria, FileDefaults::default()).await.unwrap().0
    }

    fn criteria(name: &str, source: &Source) -> ThumbnailCriteria {
        ThumbnailCriteria { storage_hash: "storage-a".to_string(), name: name.to_string(), source_id: source.id }
    }

    #[tokio::test]
    async fn test_thumbnail_unique_per_source() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let first = seed_source(&db, "a.png").await;
        let second = seed_source(&db, "b.png").await;

        let (t1, created) = db.thumbnail_get_or_create(&criteria("thumb.png", &first), FileDefaults::default()).await.unwrap();
        assert!(created);
        let (t2, created) = db.thumbnail_get_or_create(&criteria("thumb.png", &second), FileDefaults::default()).await.unwrap();
        assert!(created);
        assert_ne!(t1.id, t2.id);

        let (again, created) = db.thumbnail_get_or_create(&criteria("thumb.png", &first), FileDefaults::default()).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, t1.id);
        assert_eq!(db.count_thumbnails().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_with_and_without_dimensions() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let source = seed_source(&db, "a.png").await;
        let (thumb, _) = db.thumbnail_get_or_create(&criteria("t.png", &source), FileDefaults::default()).await.unwrap();
        db.set_dimensions(thumb.id, Some(100), Some(50)).await.unwrap();

        let plain = db.thumbnail_find(&criteria("t.png", &source), false).await.unwrap().unwrap();
        assert!(plain.dimensions.is_none());

        let joined = db.thumbnail_find(&criteria("t.png", &source), true).await.unwrap().unwrap();
        assert_eq!(joined.dimensions.unwrap().size(), (Some(100), Some(50)));
    }

    #[tokio::test]
    async fn test_set_dimensions_upserts() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let source = seed_source(&db, "a.png").await;
        let (thumb, _) = db.thumbnail_get_or_create(&criteria("t.png", &source), FileDefaults::default()).await.unwrap();

        db.set_dimensions(thumb.id, Some(10), None).await.unwrap();
        db.set_dimensions(thumb.id, Some(20), Some(30)).await.unwrap();

        let dims = db.get_dimensions(thumb.id).await.unwrap().unwrap();
        assert_eq!(dims.to_string(), "20x30");
    }

    #[tokio::test]
    async fn test_delete_source_cascades() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let source = seed_source(&db, "a.png").await;
        let keep = seed_source(&db, "b.png").await;
        let (t1, _) = db.thumbnail_get_or_create(&criteria("t1.png", &source), FileDefaults::default()).await.unwrap();
        let (t2, _) = db.thumbnail_get_or_create(&criteria("t2.png", &source), FileDefaults::default()).await.unwrap();
        db.thumbnail_get_or_create(&criteria("t3.png", &keep), FileDefaults::default()).await.unwrap();
        db.set_dimensions(t1.id, Some(1), Some(1)).await.unwrap();
        db.set_dimensions(t2.id, Some(2), Some(2)).await.unwrap();
        assert_eq!(db.thumbnails_for_source(source.id).await.unwrap().len(), 2);

        assert_eq!(db.delete_source(source.id).await.unwrap(), 1);

        assert!(db.thumbnails_for_source(source.id).await.unwrap().is_empty());
        assert!(db.get_dimensions(t1.id).await.unwrap().is_none());
        assert!(db.get_dimensions(t2.id).await.unwrap().is_none());
        assert_eq!(db.count_thumbnails().await.unwrap(), 1);
        assert_eq!(db.count_sources().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_thumbnail_requires_existing_source() {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let orphan = ThumbnailCriteria { storage_hash: "s".to_string(), name: "t.png".to_string(), source_id: 999 };
        let result = db.thumbnail_get_or_create(&orphan, FileDefaults::default()).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
