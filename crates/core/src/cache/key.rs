//! Cache key derivation for record lookups.
//!
//! Keys are namespaced by a version tag so entries written by an
//! incompatible build are never read back.

use crate::models::{RecordKind, SourceCriteria, ThumbnailCriteria};

const PREFIX: &str = "thumbs";

/// Version tag used when none is configured.
pub fn current_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Cache key for a source lookup.
pub fn source_key(version: &str, criteria: &SourceCriteria) -> String {
    format!("{PREFIX}:{version}:{}:{}:{}", RecordKind::Source, criteria.storage_hash, criteria.name)
}

/// Cache key for a thumbnail lookup. The source id is the last segment.
pub fn thumbnail_key(version: &str, criteria: &ThumbnailCriteria) -> String {
    format!(
        "{PREFIX}:{version}:{}:{}:{}:{}",
        RecordKind::Thumbnail,
        criteria.storage_hash,
        criteria.name,
        criteria.source_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> SourceCriteria {
        SourceCriteria { storage_hash: "abc123".to_string(), name: name.to_string() }
    }

    fn thumbnail(name: &str, source_id: i64) -> ThumbnailCriteria {
        ThumbnailCriteria { storage_hash: "abc123".to_string(), name: name.to_string(), source_id }
    }

    #[test]
    fn test_key_stability() {
        assert_eq!(source_key("1.0", &source("img.png")), source_key("1.0", &source("img.png")));
        assert_eq!(source_key("1.0", &source("img.png")), "thumbs:1.0:source:abc123:img.png");
    }

    #[test]
    fn test_kinds_never_collide() {
        let s = source_key("1.0", &source("img.png"));
        let t = thumbnail_key("1.0", &thumbnail("img.png", 1));
        assert_ne!(s, t);
    }

    #[test]
    fn test_version_changes_key() {
        assert_ne!(source_key("1.0", &source("img.png")), source_key("1.1", &source("img.png")));
        assert_ne!(thumbnail_key("1.0", &thumbnail("t.png", 4)), thumbnail_key("1.1", &thumbnail("t.png", 4)));
    }

    #[test]
    fn test_thumbnail_key_includes_source() {
        assert_ne!(thumbnail_key("1.0", &thumbnail("t.png", 1)), thumbnail_key("1.0", &thumbnail("t.png", 2)));
    }

    #[test]
    fn test_default_version_not_empty() {
        assert!(!current_version().is_empty());
    }
}
