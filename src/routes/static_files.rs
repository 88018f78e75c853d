//! Static File Serving
//!
//! `/static` serves the static directory, screenshots included, and
//! `/favicon.ico` serves the configured icon file.

use axum::Router;
use crate::config::{ServerConfig, STATIC_WEB_ROOT};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

pub fn router(config: &ServerConfig) -> Router {
    if config.static_dir.is_dir() {
        info!(path = %config.static_dir.display(), "Serving static files");
    } else {
        warn!(path = %config.static_dir.display(), "Static files directory not found");
    }
    if !config.favicon_path.is_file() {
        warn!(path = %config.favicon_path.display(), "Favicon not found, /favicon.ico will 404");
    }

    Router::new()
        .nest_service(STATIC_WEB_ROOT, ServeDir::new(&config.static_dir))
        .route_service("/favicon.ico", ServeFile::new(&config.favicon_path))
}
