//! API Routes
//!
//! - `POST /processLLMfetchRequest` - raw chat proxy, streamed
//! - `POST /processLLMfetchRequestFor*/` - agent endpoints
//! - `GET /api/health` - health check
//! - `/static`, `/favicon.ico` - static files

pub mod agents;
pub mod chat;
pub mod health;
pub mod static_files;

use axum::Router;
use crate::middleware::cors_layer;
use crate::models::AppState;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(chat::router(state.clone()))
        .merge(agents::router(state.clone()))
        .merge(health::router(state.clone()))
        .merge(static_files::router(&state.config.server))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
