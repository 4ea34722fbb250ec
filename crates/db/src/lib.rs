pub mod source;
pub mod sync;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use wellmap_common::error::{WellmapError, WellmapResult};

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> WellmapResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> WellmapResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| WellmapError::Database(format!("migration failed: {e}")))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&url).await.expect("db should connect");
    run_migrations(&pool).await.expect("migrations should apply");
    Some(pool)
}
