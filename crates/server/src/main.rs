//! mcp-thumbs server entry point.
//!
//! Boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use thumbs_core::{AppConfig, CacheClient, FileResolver, FileSystemStorage, RecordEvent, ResolverSettings, ThumbsDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

fn log_event(event: &RecordEvent) {
    match event {
        RecordEvent::Created { kind, id, name } => tracing::info!(%kind, id, name = name.as_str(), "record created"),
        RecordEvent::ModifiedUpdated { kind, id, modified } => {
            tracing::info!(%kind, id, %modified, "record modified timestamp updated")
        }
        RecordEvent::Deleted { kind, id, name } => tracing::info!(%kind, id, name = name.as_str(), "record deleted"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        media = %config.media_root.display(),
        "Starting mcp-thumbs server on stdio transport"
    );

    let db = ThumbsDb::open(&config.db_path).await?;
    let cache = CacheClient::from_config(&config).await?;
    let resolver = FileResolver::new(Arc::new(db), cache, ResolverSettings::from(&config)).with_hook(log_event);
    let storage = FileSystemStorage::new(config.media_root.clone());

    let handler = handler::McpThumbsServer::new(resolver, storage);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
