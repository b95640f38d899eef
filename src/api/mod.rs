// src/api/mod.rs — HTTP control endpoint for the running daemon

pub mod auth;
pub mod handlers;
pub mod types;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;

use crate::core::LifecycleOrchestrator;
use crate::infra::config::ApiConfig;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<LifecycleOrchestrator>,
    pub token: Option<String>,
    pub default_quality: String,
    /// Signalled by `POST /api/v1/shutdown`; the daemon loop waits on it.
    pub shutdown: Arc<Notify>,
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/streamers", get(handlers::list_streamers))
        .route("/api/v1/streamers", post(handlers::add_streamer))
        .route("/api/v1/streamers/{name}", delete(handlers::remove_streamer))
        .route("/api/v1/poll", post(handlers::poll_now))
        .route("/api/v1/settings", put(handlers::update_settings))
        .route("/api/v1/shutdown", post(handlers::shutdown))
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `127.0.0.1:<port>` until `stop` is notified.
pub async fn start_server(
    config: &ApiConfig,
    state: ApiState,
    stop: Arc<Notify>,
) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{}", config.port);
    let router = build_router(state);

    tracing::info!("API server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { stop.notified().await })
        .await?;
    Ok(())
}
