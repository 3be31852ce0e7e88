//! HTTP API
//!
//! Read-only JSON endpoints over the monitoring data.
//!
//! ## Endpoints
//!
//! - `GET /` - Redirect to `/api/v1/`
//! - `GET /api/v1/` - Service name and version
//! - `GET /api/v1/health` - Latest health status
//! - `GET /api/v1/metrics` - Latest collection result
//! - `GET /api/v1/metrics/history?limit=N` - Recent collection results
//! - `GET /api/v1/agents` - Agent states and cycle counters
//! - `GET /api/v1/system/info` - Static host information

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with all routes
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root::redirect))
        .route("/api/v1", get(routes::root::index))
        .route("/api/v1/", get(routes::root::index))
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/metrics", get(routes::metrics::latest))
        .route("/api/v1/metrics/history", get(routes::metrics::history))
        .route("/api/v1/agents", get(routes::agents::list_agents))
        .route("/api/v1/system/info", get(routes::system::system_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Spawn the API server
///
/// This binds the listener, starts serving in a background task and returns the local address.
pub async fn spawn_api_server(bind_addr: SocketAddr, state: ApiState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    let addr = listener.local_addr()?;

    info!("API server listening on {addr}");

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("API server error: {e}");
        }
    });

    Ok(addr)
}
