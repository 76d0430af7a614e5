//! Store bootstrap: connection pool, liveness probe and migrations

use crate::config::DatabaseConfig;
use crate::store::{StoreError, PULSES_TABLE};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::info;

/// The job has a single writer; one spare connection covers migrations.
const MAX_CONNECTIONS: u32 = 2;

/// Open the pool and verify the server answers
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let mut options: PgConnectOptions = config.url.parse()?;
    if let Some(ref name) = config.name {
        options = options.database(name);
    }

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await?;

    ping(&pool).await?;

    Ok(pool)
}

/// Round-trip a trivial query
pub async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the workspace `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!(table = PULSES_TABLE, "Database migrations completed");
    Ok(())
}
