//! Task Tree Server Binary
//!
//! Starts the REST API over an in-memory task store.
//!
//! # Environment Variables
//!
//! - `TASKTREE_PORT`: Server port (default: 3001)
//! - `CORS_ALLOW_ORIGIN`: Comma-separated allowed origins
//! - `TASKTREE_ROOT_ID`, `TASKTREE_MAX_DEPTH`, `TASKTREE_DELETE_POLICY`,
//!   `TASKTREE_HISTORY_CAPACITY`: tree configuration
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::sync::Arc;

use anyhow::anyhow;
use tasktree_core::db::InMemoryTaskStore;
use tasktree_core::{TaskService, TreeConfig};
use tasktree_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Task Tree Server");

    let tree_config = TreeConfig::from_env().map_err(|e| anyhow!("Invalid tree config: {}", e))?;
    let server_config =
        ServerConfig::from_env().map_err(|e| anyhow!("Invalid server config: {}", e))?;

    tracing::info!(
        "Tree: root '{}', max depth {}, delete policy {}",
        tree_config.root_id,
        tree_config.max_depth,
        tree_config.delete_policy
    );

    let store = Arc::new(InMemoryTaskStore::new());
    let service = TaskService::new(store, tree_config);
    service.ensure_root().await?;

    tasktree_server::start_server(service, server_config).await
}
