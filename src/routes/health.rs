use axum::{extract::State, routing::get, Json, Router};
use crate::db::health_check;
use crate::models::{AppState, HealthResponse};
use tracing::warn;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(state)
}

/// The server is up even when Postgres is not; only the SQL agents need it
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match health_check(&state.pool).await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: database.to_string(),
    })
}
