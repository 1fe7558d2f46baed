//! soluce-sw entry point.
//!
//! Boots the offline worker behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use soluce_client::{FetchClient, FetchConfig, InMemoryClients, InMemoryNotifier, OfflineWorker, WorkerConfig};
use soluce_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker_config = WorkerConfig::try_from(&config)?;

    tracing::info!(
        origin = %config.origin,
        version = %config.version,
        db = %config.db_path.display(),
        "Starting soluce-sw on stdio transport"
    );

    let cache = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;

    let worker = OfflineWorker::new(
        worker_config,
        Arc::new(cache.clone()),
        Arc::new(network),
        Arc::new(InMemoryClients::new()),
        Arc::new(InMemoryNotifier::new()),
    );

    let handler = handler::SoluceSwServer::new(Arc::new(worker), cache);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
