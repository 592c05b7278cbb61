//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    CacheInvalidateParams, SourceGetParams, ThumbnailGetParams, invalidate_impl, source_get_impl, thumbnail_get_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use thumbs_core::{FileResolver, FileSystemStorage};

/// The main MCP server handler for mcp-thumbs.
#[derive(Clone)]
pub struct McpThumbsServer {
    tool_router: ToolRouter<Self>,
    resolver: FileResolver,
    storage: FileSystemStorage,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl McpThumbsServer {
    /// Create a new server handler serving files from `storage`.
    pub fn new(resolver: FileResolver, storage: FileSystemStorage) -> Self {
        Self { tool_router: Self::tool_router(), resolver, storage }
    }

    /// Look up the record for a source file.
    #[tool(
        description = "Get the record for a source file. Optionally create it, check storage on a miss, or update its modified timestamp."
    )]
    async fn source_get(&self, params: Parameters<SourceGetParams>) -> Result<CallToolResult, McpError> {
        source_get_impl(&self.resolver, &self.storage, params.0).await
    }

    /// Look up the record for a thumbnail of a source file.
    #[tool(
        description = "Get the record for a thumbnail generated from a source file, including its dimensions when loaded."
    )]
    async fn thumbnail_get(&self, params: Parameters<ThumbnailGetParams>) -> Result<CallToolResult, McpError> {
        thumbnail_get_impl(&self.resolver, &self.storage, params.0).await
    }

    #[tool(description = "Drop the cached record for a source file or one of its thumbnails.")]
    async fn cache_invalidate(&self, params: Parameters<CacheInvalidateParams>) -> Result<CallToolResult, McpError> {
        invalidate_impl(&self.resolver, &self.storage, params.0).await
    }
}

impl ServerHandler for McpThumbsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-thumbs".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
