// Agent Router - HTTP backend routing free-text requests to LLM agents

pub mod agents;
pub mod config;
pub mod db;
pub mod llm;
pub mod mcp;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
