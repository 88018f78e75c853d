use crate::config::DatabaseConfig;
use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub use operations::*;
pub use pool::*;

pub mod operations;
pub mod pool;

/// Build the pool without connecting.
///
/// Only the SQL agents need Postgres, so the server starts even when the
/// database is down and those routes fail individually.
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(&config.url)?;

    Ok(pool)
}
