//! Database pool construction and migrations.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Errors from pool construction or migration.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Create the main connection pool used for request handling.
///
/// Acquire timeout is bounded so a saturated pool surfaces as an error
/// instead of hanging the request.
pub async fn create_pool(database_url: &str) -> Result<PgPool, PoolError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!("Database pool created");
    Ok(pool)
}

/// Create a pool for running migrations.
///
/// Uses a single connection with a longer timeout; migrations must go
/// through a direct connection when the regular URL points at a pooler
/// that cannot handle prepared statements.
pub async fn create_migration_pool(database_url: &str) -> Result<PgPool, PoolError> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Run embedded migrations against the given pool.
pub async fn run_migrations(pool: &PgPool) -> Result<(), PoolError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
