//! Structured errors raised by the tool layer itself.
//!
//! Errors from the record layer arrive as `thumbs_core::Error` and are
//! converted by core.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the thumbs server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., unparseable timestamp).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The source a thumbnail belongs to has no record and is not in storage.
    #[error("SOURCE_NOT_FOUND: {0}")]
    SourceNotFound(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::SourceNotFound(name) => (-32001, format!("No source record or file for {name:?}")),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
