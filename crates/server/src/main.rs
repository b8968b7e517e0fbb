//! swcache server entry point.
//!
//! Boots the worker registration from configuration and serves it over
//! the MCP stdio transport. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting swcache server on stdio transport"
    );

    let state = state::AppState::init(config).await?;
    let handler = handler::SwCacheServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
