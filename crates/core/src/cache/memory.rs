//! In-process cache backend.

use std::fmt;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;

/// Default entry bound, matching a stock locmem cache.
pub const DEFAULT_MAX_ENTRIES: u64 = 300;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// Expires each entry after its own TTL; `None` lives until evicted.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self, _key: &String, entry: &Entry, _updated_at: Instant, _remaining: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Bounded concurrent in-memory key/value cache with optional per-entry TTL.
///
/// Once `max_entries` is reached moka evicts the least useful entries.
/// Clones share the same cache.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .field("max_entries", &self.entries.policy().max_capacity())
            .finish()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: u64) -> Self {
        let entries = Cache::builder().max_capacity(max_entries).expire_after(EntryTtl).build();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value)
    }

    /// Store `value`, replacing any previous entry. `None` never expires.
    pub fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.entries.insert(key.to_string(), Entry { value: value.to_string(), ttl });
    }

    /// Returns true if an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of live entries, after applying pending evictions.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
