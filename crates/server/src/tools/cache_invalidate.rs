//! cache_invalidate tool implementation.
//!
//! Drops the cached copy of a source or thumbnail record so the next lookup
//! reads the store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thumbs_core::{FileResolver, ResolveOptions, Storage};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateParams {
    /// Source file name, or the thumbnail's source when `thumbnail` is set.
    pub name: String,

    /// Invalidate this thumbnail of `name` instead of the source itself.
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Output from the cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInvalidateOutput {
    /// Whether a cache entry was removed.
    pub removed: bool,
}

/// Implementation of the cache_invalidate tool.
pub async fn invalidate_impl(
    resolver: &FileResolver, storage: &dyn Storage, params: CacheInvalidateParams,
) -> Result<CallToolResult, McpError> {
    let removed = match &params.thumbnail {
        None => resolver.invalidate_source(storage, &params.name).await?,
        Some(thumbnail) => {
            let source = resolver
                .get_source(storage, &params.name, ResolveOptions::default())
                .await?
                .ok_or_else(|| ToolError::SourceNotFound(params.name.clone()))?;
            resolver.invalidate_thumbnail(storage, thumbnail, &source).await?
        }
    };

    json_result(&CacheInvalidateOutput { removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{parse, resolver, storage};

    #[tokio::test]
    async fn test_invalidate_cached_source() {
        let (resolver, _db) = resolver().await;
        let storage = storage();
        resolver
            .get_source(&storage, "Cargo.toml", ResolveOptions::default().with_storage_check())
            .await
            .unwrap();
        // Records found in the store are cached on read.
        resolver.get_source(&storage, "Cargo.toml", ResolveOptions::default()).await.unwrap();

        let params = CacheInvalidateParams { name: "Cargo.toml".into(), thumbnail: None };
        let result = invalidate_impl(&resolver, &storage, params.clone()).await.unwrap();
        let output: CacheInvalidateOutput = parse(&result);
        assert!(output.removed);

        let result = invalidate_impl(&resolver, &storage, params).await.unwrap();
        let output: CacheInvalidateOutput = parse(&result);
        assert!(!output.removed);
    }

    #[tokio::test]
    async fn test_invalidate_thumbnail_of_unknown_source() {
        let (resolver, _db) = resolver().await;
        let params = CacheInvalidateParams { name: "nope.png".into(), thumbnail: Some("t.png".into()) };
        assert!(invalidate_impl(&resolver, &storage(), params).await.is_err());
    }
}
