//! SQLite-backed record store for sources, thumbnails and their dimensions.
//!
//! - Atomic create-or-fetch on the UNIQUE constraints
//! - Partial `modified` updates
//! - Cascading deletes (foreign keys are enabled on every connection)
//! - Automatic schema migrations

pub mod connection;
pub mod migrations;
pub mod sources;
pub mod thumbnails;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;

pub use connection::ThumbsDb;

use crate::Error;
use crate::models::{FileDefaults, RecordKind, Source, SourceCriteria, Thumbnail, ThumbnailCriteria};

/// Store operations the resolver depends on.
///
/// Implemented by [`ThumbsDb`]; wrappers (e.g. instrumented stores in tests)
/// can implement it by delegation.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert-if-absent, returning the record and whether it was created.
    async fn get_or_create_source(
        &self, criteria: &SourceCriteria, defaults: FileDefaults,
    ) -> Result<(Source, bool), Error>;

    async fn find_source(&self, criteria: &SourceCriteria) -> Result<Option<Source>, Error>;

    /// Insert-if-absent, returning the record and whether it was created.
    async fn get_or_create_thumbnail(
        &self, criteria: &ThumbnailCriteria, defaults: FileDefaults,
    ) -> Result<(Thumbnail, bool), Error>;

    async fn find_thumbnail(
        &self, criteria: &ThumbnailCriteria, with_dimensions: bool,
    ) -> Result<Option<Thumbnail>, Error>;

    /// Update only the `modified` column of one row.
    ///
    /// Returns the number of rows changed; 0 means the row no longer exists.
    async fn update_modified(&self, kind: RecordKind, id: i64, modified: DateTime<Utc>) -> Result<u64, Error>;

    /// Delete a source and, by cascade, its thumbnails. Returns rows deleted.
    async fn remove_source(&self, id: i64) -> Result<u64, Error>;

    async fn list_thumbnails(&self, source_id: i64) -> Result<Vec<Thumbnail>, Error>;
}

#[async_trait]
impl RecordStore for ThumbsDb {
    async fn get_or_create_source(
        &self, criteria: &SourceCriteria, defaults: FileDefaults,
    ) -> Result<(Source, bool), Error> {
        self.source_get_or_create(criteria, defaults).await
    }

    async fn find_source(&self, criteria: &SourceCriteria) -> Result<Option<Source>, Error> {
        self.source_find(criteria).await
    }

    async fn get_or_create_thumbnail(
        &self, criteria: &ThumbnailCriteria, defaults: FileDefaults,
    ) -> Result<(Thumbnail, bool), Error> {
        self.thumbnail_get_or_create(criteria, defaults).await
    }

    async fn find_thumbnail(
        &self, criteria: &ThumbnailCriteria, with_dimensions: bool,
    ) -> Result<Option<Thumbnail>, Error> {
        self.thumbnail_find(criteria, with_dimensions).await
    }

    async fn update_modified(&self, kind: RecordKind, id: i64, modified: DateTime<Utc>) -> Result<u64, Error> {
        let sql = format!("UPDATE {} SET modified = ?1 WHERE id = ?2", kind.table());
        let modified = connection::encode_ts(&modified);
        tracing::debug!(%kind, id, "updating modified timestamp");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(&sql, params![modified, id])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn remove_source(&self, id: i64) -> Result<u64, Error> {
        self.delete_source(id).await
    }

    async fn list_thumbnails(&self, source_id: i64) -> Result<Vec<Thumbnail>, Error> {
        self.thumbnails_for_source(source_id).await
    }
}
