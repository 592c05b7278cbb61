//! Persisted record types and their lookup criteria.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source file known to a storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub storage_hash: String,
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// A generated thumbnail of a [`Source`].
///
/// `dimensions` is only populated when the lookup asked for it
/// (see `AppConfig::cache_dimensions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub id: i64,
    pub storage_hash: String,
    pub name: String,
    pub modified: DateTime<Utc>,
    pub source_id: i64,
    #[serde(default)]
    pub dimensions: Option<ThumbnailDimensions>,
}

/// Pixel size recorded for a thumbnail. Either side may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailDimensions {
    pub thumbnail_id: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ThumbnailDimensions {
    pub fn size(&self) -> (Option<u32>, Option<u32>) {
        (self.width, self.height)
    }
}

fn side(value: Option<u32>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

impl fmt::Display for ThumbnailDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", side(self.width), side(self.height))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Source,
    Thumbnail,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Source => "source",
            RecordKind::Thumbnail => "thumbnail",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            RecordKind::Source => "sources",
            RecordKind::Thumbnail => "thumbnails",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over both record kinds used by the resolver.
pub trait FileRecord: Clone + Serialize + serde::de::DeserializeOwned + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> i64;
    fn name(&self) -> &str;
    fn modified(&self) -> DateTime<Utc>;
    fn set_modified(&mut self, modified: DateTime<Utc>);
}

impl FileRecord for Source {
    const KIND: RecordKind = RecordKind::Source;

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn set_modified(&mut self, modified: DateTime<Utc>) {
        self.modified = modified;
    }
}

impl FileRecord for Thumbnail {
    const KIND: RecordKind = RecordKind::Thumbnail;

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn set_modified(&mut self, modified: DateTime<Utc>) {
        self.modified = modified;
    }
}

/// Unique lookup fields for a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceCriteria {
    pub storage_hash: String,
    pub name: String,
}

/// Unique lookup fields for a [`Thumbnail`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailCriteria {
    pub storage_hash: String,
    pub name: String,
    pub source_id: i64,
}

/// Field values applied only when create-or-fetch inserts a new row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileDefaults {
    /// Falls back to the current time when unset.
    pub modified: Option<DateTime<Utc>>,
}

impl FileDefaults {
    pub fn modified_or_now(&self) -> DateTime<Utc> {
        self.modified.unwrap_or_else(Utc::now)
    }
}
