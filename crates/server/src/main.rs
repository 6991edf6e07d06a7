//! shellcache server entry point.
//!
//! Boots the worker host and serves MCP on stdio. Logging goes to stderr to
//! avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    tracing::info!(app = %config.app_name, scope = %config.scope_url, db = %config.db_path.display(), "starting shellcache on stdio transport");

    let host = Arc::new(host::WorkerHost::new(config, db)?);

    // A failed startup install is retried through worker_install.
    match host.controller(None) {
        Ok(controller) => {
            if let Err(e) = host.registration().register(controller).await {
                tracing::warn!(error = %e, "startup install failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "no release version; skipping startup install"),
    }

    let handler = handler::ShellcacheServer::new(host);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
