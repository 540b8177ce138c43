//! Task Tree HTTP Server
//!
//! REST adapter over [`tasktree_core::TaskService`]. Every route translates
//! a request into one service call; tree rules and error codes come from the
//! core crate.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tasktree-server
//! TASKTREE_PORT=3002 RUST_LOG=debug cargo run --bin tasktree-server
//! ```
//!
//! # Security
//!
//! - Binds to 127.0.0.1 only
//! - CORS restricted to the configured origins
//! - No authentication

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tasktree_core::TaskService;

pub mod config;
mod http_error;
mod task_endpoints;

pub use config::ServerConfig;
pub use http_error::HttpError;
pub use task_endpoints::ListTasksQuery;

/// Application state shared across all endpoints
///
/// `TaskService` already serializes structural edits behind its own write
/// lock, so handlers call it directly.
#[derive(Clone)]
pub struct AppState {
    pub service: TaskService,
}

impl AppState {
    pub fn new(service: TaskService) -> Self {
        Self { service }
    }
}

/// Create the application router with all endpoint modules merged
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(task_endpoints::routes(state))
        .layer(cors_layer(&config.cors_allow_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS layer for the configured browser origins
///
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<header::HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<header::HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_credentials(false)
}

/// Start the HTTP server
///
/// The root sentinel must already exist (see
/// [`TaskService::ensure_root`]).
///
/// # Errors
///
/// Returns error if the server fails to bind or start.
pub async fn start_server(service: TaskService, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(AppState::new(service), &config);

    let addr = config.bind_addr();
    tracing::info!("Task tree server starting on http://{}", addr);
    tracing::info!("CORS origins: {}", config.cors_allow_origins.join(", "));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
