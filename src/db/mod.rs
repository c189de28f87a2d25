use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};

/// Build the connection pool from configured sizing and deadlines. The
/// acquire timeout bounds how long any request waits for a connection; a
/// saturated pool fails the request rather than queueing indefinitely.
pub async fn create_pool(database_url: &str, settings: &DatabaseSettings) -> AppResult<PgPool> {
    info!(
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout.as_secs(),
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {:?}", e);
            AppError::Database(e)
        })?;

    info!("Database connection pool ready");
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> AppResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

    Ok(())
}
