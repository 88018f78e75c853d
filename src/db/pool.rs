use crate::types::AppResult;
use sqlx::PgPool;

/// Round-trip a trivial query through the pool
pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
