//! MCP tool implementations.
//!
//! Each tool resolves records through the shared `FileResolver` against the
//! configured filesystem storage.

pub mod cache_invalidate;
pub mod source_get;
pub mod thumbnail_get;

use chrono::{DateTime, Utc};
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thumbs_core::{Error, ResolveOptions};

use crate::error::ToolError;

pub use cache_invalidate::{CacheInvalidateParams, invalidate_impl};
pub use source_get::{SourceGetParams, source_get_impl};
pub use thumbnail_get::{ThumbnailGetParams, thumbnail_get_impl};

/// Lookup flags shared by the `*_get` tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LookupFlags {
    /// Create the record if it does not exist.
    #[serde(default)]
    pub create: bool,

    /// RFC 3339 timestamp the record's `modified` should be set to.
    #[serde(default)]
    pub update_modified: Option<String>,

    /// On a miss, check whether the file exists in storage and record it if so.
    #[serde(default)]
    pub check_storage: bool,
}

impl LookupFlags {
    pub fn to_options(&self) -> Result<ResolveOptions, ToolError> {
        let update_modified = self
            .update_modified
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|e| ToolError::InvalidInput(format!("update_modified {raw:?}: {e}")))
            })
            .transpose()?;

        Ok(ResolveOptions { create: self.create, update_modified, check_storage_on_miss: self.check_storage })
    }
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use thumbs_core::{CacheClient, FileResolver, FileSystemStorage, ResolverSettings, ThumbsDb};

    pub async fn resolver() -> (FileResolver, ThumbsDb) {
        let db = ThumbsDb::open_in_memory().await.unwrap();
        let resolver = FileResolver::new(
            Arc::new(db.clone()),
            CacheClient::Memory(Default::default()),
            ResolverSettings::default(),
        );
        (resolver, db)
    }

    /// Storage rooted at this crate, so `Cargo.toml` exists and little else.
    pub fn storage() -> FileSystemStorage {
        FileSystemStorage::new(env!("CARGO_MANIFEST_DIR"))
    }

    pub fn parse<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
