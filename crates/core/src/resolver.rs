//! Cached lookup of source and thumbnail records.
//!
//! [`FileResolver`] answers "is there a record for this file, and is it
//! fresh?" with these rules:
//!
//! - Reads go to the cache first, then the store. Store hits are written
//!   back to the cache with no expiry.
//! - `create` goes straight to the store's create-or-fetch and does not
//!   touch the cache, so the first read after a create still hits the store.
//! - A store miss can fall back to checking the storage itself, creating the
//!   record if the file turned up. That record is returned uncached.
//! - A differing `update_modified` is written as a single-column update and
//!   mirrored into the cached copy. If the row has gone, the cached copy is
//!   dropped and the store is read again.
//!
//! Concurrent creators are kept apart by the store's UNIQUE constraints; the
//! resolver holds no locks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Error;
use crate::cache::{CacheClient, key};
use crate::config::AppConfig;
use crate::models::{
    FileDefaults, FileRecord, RecordKind, Source, SourceCriteria, Thumbnail, ThumbnailCriteria,
};
use crate::storage::{Storage, storage_hash};
use crate::store::RecordStore;

/// Resolver behaviour taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Cache records on read (also requires an enabled cache).
    pub queryset_caching: bool,
    /// Load dimensions together with thumbnails.
    pub cache_dimensions: bool,
    /// Namespace for cache keys.
    pub version_tag: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self { queryset_caching: true, cache_dimensions: false, version_tag: key::current_version().to_string() }
    }
}

impl From<&AppConfig> for ResolverSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            queryset_caching: config.queryset_caching,
            cache_dimensions: config.cache_dimensions,
            version_tag: config
                .version_tag
                .clone()
                .unwrap_or_else(|| key::current_version().to_string()),
        }
    }
}

/// Per-call lookup options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Create the record if it does not exist.
    pub create: bool,
    /// Timestamp the record's `modified` should end up at.
    pub update_modified: Option<DateTime<Utc>>,
    /// On a store miss, ask the storage whether the file exists after all.
    pub check_storage_on_miss: bool,
}

impl ResolveOptions {
    pub fn create() -> Self {
        Self { create: true, ..Self::default() }
    }

    pub fn with_update_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.update_modified = Some(modified);
        self
    }

    pub fn with_storage_check(mut self) -> Self {
        self.check_storage_on_miss = true;
        self
    }
}

/// Emitted after the resolver writes to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    Created { kind: RecordKind, id: i64, name: String },
    ModifiedUpdated { kind: RecordKind, id: i64, modified: DateTime<Utc> },
    Deleted { kind: RecordKind, id: i64, name: String },
}

/// Callback for [`RecordEvent`]s, registered with [`FileResolver::with_hook`].
pub trait RecordHook: Send + Sync {
    fn on_event(&self, event: &RecordEvent);
}

impl<F> RecordHook for F
where
    F: Fn(&RecordEvent) + Send + Sync,
{
    fn on_event(&self, event: &RecordEvent) {
        self(event)
    }
}

/// Lookup criteria that know their record type, cache key and store calls.
#[async_trait]
trait Lookup: Send + Sync {
    type Record: FileRecord;

    fn name(&self) -> &str;

    fn cache_key(&self, version: &str) -> String;

    async fn find(&self, store: &dyn RecordStore, settings: &ResolverSettings) -> Result<Option<Self::Record>, Error>;

    async fn get_or_create(
        &self, store: &dyn RecordStore, defaults: FileDefaults,
    ) -> Result<(Self::Record, bool), Error>;
}

#[async_trait]
impl Lookup for SourceCriteria {
    type Record = Source;

    fn name(&self) -> &str {
        &self.name
    }

    fn cache_key(&self, version: &str) -> String {
        key::source_key(version, self)
    }

    async fn find(&self, store: &dyn RecordStore, _settings: &ResolverSettings) -> Result<Option<Source>, Error> {
        store.find_source(self).await
    }

    async fn get_or_create(&self, store: &dyn RecordStore, defaults: FileDefaults) -> Result<(Source, bool), Error> {
        store.get_or_create_source(self, defaults).await
    }
}

#[async_trait]
impl Lookup for ThumbnailCriteria {
    type Record = Thumbnail;

    fn name(&self) -> &str {
        &self.name
    }

    fn cache_key(&self, version: &str) -> String {
        key::thumbnail_key(version, self)
    }

    async fn find(&self, store: &dyn RecordStore, settings: &ResolverSettings) -> Result<Option<Thumbnail>, Error> {
        store.find_thumbnail(self, settings.cache_dimensions).await
    }

    async fn get_or_create(
        &self, store: &dyn RecordStore, defaults: FileDefaults,
    ) -> Result<(Thumbnail, bool), Error> {
        store.get_or_create_thumbnail(self, defaults).await
    }
}

/// Resolves source and thumbnail records through the cache and store.
///
/// Cheap to clone; clones share the store, cache and hooks.
#[derive(Clone)]
pub struct FileResolver {
    store: Arc<dyn RecordStore>,
    cache: CacheClient,
    settings: ResolverSettings,
    hooks: Vec<Arc<dyn RecordHook>>,
}

impl fmt::Debug for FileResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResolver")
            .field("cache", &self.cache.backend_name())
            .field("settings", &self.settings)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl FileResolver {
    pub fn new(store: Arc<dyn RecordStore>, cache: CacheClient, settings: ResolverSettings) -> Self {
        Self { store, cache, settings, hooks: Vec::new() }
    }

    /// Register a callback run after records are created or their `modified` changes.
    pub fn with_hook(mut self, hook: impl RecordHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    fn caching(&self) -> bool {
        self.cache.is_enabled() && self.settings.queryset_caching
    }

    /// Resolve the source record for `name` in `storage`.
    ///
    /// Returns `Ok(None)` when there is no record and none was created.
    pub async fn get_source(
        &self, storage: &dyn Storage, name: &str, options: ResolveOptions,
    ) -> Result<Option<Source>, Error> {
        let criteria = SourceCriteria { storage_hash: storage_hash(storage), name: checked_name(name)? };
        self.resolve(&criteria, storage, options).await
    }

    /// Resolve the thumbnail record for `name` in `storage`, generated from `source`.
    pub async fn get_thumbnail(
        &self, storage: &dyn Storage, name: &str, source: &Source, options: ResolveOptions,
    ) -> Result<Option<Thumbnail>, Error> {
        let criteria = ThumbnailCriteria {
            storage_hash: storage_hash(storage),
            name: checked_name(name)?,
            source_id: source.id,
        };
        self.resolve(&criteria, storage, options).await
    }

    /// Drop the cached source record for `name`, if any.
    pub async fn invalidate_source(&self, storage: &dyn Storage, name: &str) -> Result<bool, Error> {
        let criteria = SourceCriteria { storage_hash: storage_hash(storage), name: checked_name(name)? };
        self.cache.delete(&criteria.cache_key(&self.settings.version_tag)).await
    }

    /// Drop the cached thumbnail record for `name`, if any.
    pub async fn invalidate_thumbnail(&self, storage: &dyn Storage, name: &str, source: &Source) -> Result<bool, Error> {
        let criteria = ThumbnailCriteria {
            storage_hash: storage_hash(storage),
            name: checked_name(name)?,
            source_id: source.id,
        };
        self.cache.delete(&criteria.cache_key(&self.settings.version_tag)).await
    }

    /// Delete `source` and its thumbnails from the store, then drop their cached copies.
    ///
    /// Returns false if the source was already gone.
    pub async fn delete_source(&self, source: &Source) -> Result<bool, Error> {
        let thumbnails = self.store.list_thumbnails(source.id).await?;
        let deleted = self.store.remove_source(source.id).await? > 0;

        let version = &self.settings.version_tag;
        let source_key = SourceCriteria { storage_hash: source.storage_hash.clone(), name: source.name.clone() };
        self.cache.delete(&source_key.cache_key(version)).await?;
        for thumbnail in &thumbnails {
            let key = ThumbnailCriteria {
                storage_hash: thumbnail.storage_hash.clone(),
                name: thumbnail.name.clone(),
                source_id: source.id,
            };
            self.cache.delete(&key.cache_key(version)).await?;
        }

        if deleted {
            tracing::debug!(id = source.id, thumbnails = thumbnails.len(), "source deleted");
            self.emit(&RecordEvent::Deleted { kind: RecordKind::Source, id: source.id, name: source.name.clone() });
        }
        Ok(deleted)
    }

    async fn resolve<L: Lookup>(
        &self, lookup: &L, storage: &dyn Storage, options: ResolveOptions,
    ) -> Result<Option<L::Record>, Error> {
        let kind = <L::Record as FileRecord>::KIND;
        let cache_key = lookup.cache_key(&self.settings.version_tag);
        let caching = self.caching();
        let store = self.store.as_ref();

        let (mut record, created) = if options.create {
            let defaults = FileDefaults { modified: options.update_modified };
            lookup.get_or_create(store, defaults).await?
        } else {
            let cached = if caching { self.cache.get_json::<L::Record>(&cache_key).await? } else { None };

            match cached {
                Some(record) => {
                    tracing::debug!(key = %cache_key, "record cache hit");
                    (record, false)
                }
                None => match lookup.find(store, &self.settings).await? {
                    Some(record) => {
                        if caching {
                            self.cache.set_json(&cache_key, &record, None).await?;
                        }
                        (record, false)
                    }
                    None => {
                        if !(options.check_storage_on_miss && storage.exists(lookup.name()).await?) {
                            tracing::debug!(key = %cache_key, "record not found");
                            return Ok(None);
                        }
                        // The file is there; another process may have created the
                        // record while storage was being checked. Not cached until
                        // a later read finds it in the store.
                        lookup.get_or_create(store, FileDefaults::default()).await?
                    }
                },
            }
        };

        if created {
            tracing::debug!(%kind, id = record.id(), "record created");
            self.emit(&RecordEvent::Created { kind, id: record.id(), name: record.name().to_string() });
        }

        let Some(modified) = options.update_modified else {
            return Ok(Some(record));
        };
        if created || record.modified() == modified {
            return Ok(Some(record));
        }

        if store.update_modified(kind, record.id(), modified).await? == 0 {
            // The row was deleted after this copy was cached.
            tracing::debug!(%kind, id = record.id(), key = %cache_key, "cached record no longer stored");
            if caching {
                self.cache.delete(&cache_key).await?;
            }
            let Some(fresh) = lookup.find(store, &self.settings).await? else {
                return Ok(None);
            };
            if caching {
                self.cache.set_json(&cache_key, &fresh, None).await?;
            }
            record = fresh;
            if record.modified() == modified {
                return Ok(Some(record));
            }
            if store.update_modified(kind, record.id(), modified).await? == 0 {
                if caching {
                    self.cache.delete(&cache_key).await?;
                }
                return Ok(None);
            }
        }

        record.set_modified(modified);
        if caching {
            self.cache.set_json(&cache_key, &record, None).await?;
        }
        tracing::debug!(%kind, id = record.id(), "record modified timestamp updated");
        self.emit(&RecordEvent::ModifiedUpdated { kind, id: record.id(), modified });

        Ok(Some(record))
    }

    fn emit(&self, event: &RecordEvent) {
        for hook in &self.hooks {
            hook.on_event(event);
        }
    }
}

fn checked_name(name: &str) -> Result<String, Error> {
    if name.is_empty() {
        return Err(Error::InvalidInput("file name must not be empty".into()));
    }
    Ok(name.to_string())
}
