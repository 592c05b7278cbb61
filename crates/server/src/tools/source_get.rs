//! source_get tool implementation.
//!
//! Resolves the record for a source file.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thumbs_core::{FileResolver, Source, Storage};

use super::{LookupFlags, json_result};

/// Parameters for the source_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceGetParams {
    /// File name relative to the media root.
    pub name: String,

    #[serde(flatten)]
    pub flags: LookupFlags,
}

/// Output from the source_get tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGetOutput {
    pub found: bool,
    pub source: Option<Source>,
}

/// Implementation of the source_get tool.
pub async fn source_get_impl(
    resolver: &FileResolver, storage: &dyn Storage, params: SourceGetParams,
) -> Result<CallToolResult, McpError> {
    let options = params.flags.to_options()?;
    let source = resolver.get_source(storage, &params.name, options).await?;

    json_result(&SourceGetOutput { found: source.is_some(), source })
}
