//! thumbnail_get tool implementation.
//!
//! Resolves the record for a thumbnail of a source file. The source itself
//! is looked up with a storage check, so a source that exists on disk but
//! has no record yet is recorded on the way.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thumbs_core::{FileResolver, ResolveOptions, Storage, Thumbnail};

use super::{LookupFlags, json_result};
use crate::error::ToolError;

/// Parameters for the thumbnail_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailGetParams {
    /// Name of the source file the thumbnail was generated from.
    pub source_name: String,

    /// Thumbnail file name relative to the media root.
    pub name: String,

    #[serde(flatten)]
    pub flags: LookupFlags,
}

/// Output from the thumbnail_get tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailGetOutput {
    pub found: bool,
    pub thumbnail: Option<Thumbnail>,
    /// Formatted as `WIDTHxHEIGHT` when dimensions were loaded.
    pub size: Option<String>,
}

/// Implementation of the thumbnail_get tool.
pub async fn thumbnail_get_impl(
    resolver: &FileResolver, storage: &dyn Storage, params: ThumbnailGetParams,
) -> Result<CallToolResult, McpError> {
    let options = params.flags.to_options()?;

    let source = resolver
        .get_source(storage, &params.source_name, ResolveOptions::default().with_storage_check())
        .await?
        .ok_or_else(|| ToolError::SourceNotFound(params.source_name.clone()))?;

    let thumbnail = resolver.get_thumbnail(storage, &params.name, &source, options).await?;
    let size = thumbnail
        .as_ref()
        .and_then(|t| t.dimensions)
        .map(|dims| dims.to_string());

    json_result(&ThumbnailGetOutput { found: thumbnail.is_some(), thumbnail, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{parse, resolver, storage};

    fn params(source_name: &str, name: &str, flags: LookupFlags) -> ThumbnailGetParams {
        ThumbnailGetParams { source_name: source_name.to_string(), name: name.to_string(), flags }
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let (resolver, _db) = resolver().await;
        let result = thumbnail_get_impl(&resolver, &storage(), params("nope.png", "t.png", LookupFlags::default())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_thumbnail() {
        let (resolver, _db) = resolver().await;
        let result = thumbnail_get_impl(&resolver, &storage(), params("Cargo.toml", "t.png", LookupFlags::default()))
            .await
            .unwrap();
        let output: ThumbnailGetOutput = parse(&result);
        assert!(!output.found);
        assert!(output.size.is_none());
    }

    #[tokio::test]
    async fn test_create_thumbnail() {
        let (resolver, db) = resolver().await;
        let flags = LookupFlags { create: true, ..Default::default() };
        let result = thumbnail_get_impl(&resolver, &storage(), params("Cargo.toml", "t.png", flags)).await.unwrap();
        let output: ThumbnailGetOutput = parse(&result);
        assert!(output.found);
        assert_eq!(output.thumbnail.unwrap().name, "t.png");
        assert_eq!(db.count_thumbnails().await.unwrap(), 1);
    }
}
