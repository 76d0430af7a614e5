//! Pulse store
//!
//! [`PulseStore`] is the seam between the sink and durable storage. The
//! production implementation, [`PgPulseStore`], keeps one row per pulse in
//! `pulses_raw` keyed by `pulse_id`.

use async_trait::async_trait;
use otx_common::types::PulseRecord;
use sqlx::PgPool;

/// Table holding the current snapshot of every pulse.
pub const PULSES_TABLE: &str = "pulses_raw";

/// Errors raised by a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failure from a store that is not backed by sqlx
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Keyed, idempotent writes of pulse records
#[async_trait]
pub trait PulseStore: Send + Sync {
    /// Insert the record, or overwrite every field of the existing record
    /// with the same `pulse_id`.
    async fn upsert_pulse(&self, record: &PulseRecord) -> Result<(), StoreError>;
}

/// PostgreSQL-backed pulse store
#[derive(Debug, Clone)]
pub struct PgPulseStore {
    pool: PgPool,
}

impl PgPulseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the stored snapshot of a pulse
    pub async fn get_pulse(&self, pulse_id: &str) -> Result<Option<PulseRecord>, StoreError> {
        let row = sqlx::query_as::<_, PulseRow>(
            r#"
            SELECT pulse_id, name, description, created, modified, ingested_at
            FROM pulses_raw
            WHERE pulse_id = $1
            "#,
        )
        .bind(pulse_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Number of pulses in the store
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pulses_raw")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl PulseStore for PgPulseStore {
    async fn upsert_pulse(&self, record: &PulseRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO pulses_raw
                (pulse_id, name, description, created, modified, ingested_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (pulse_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                created = EXCLUDED.created,
                modified = EXCLUDED.modified,
                ingested_at = EXCLUDED.ingested_at
            "#,
        )
        .bind(&record.pulse_id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(&record.created)
        .bind(&record.modified)
        .bind(record.ingested_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PulseRow {
    pulse_id: String,
    name: String,
    description: String,
    created: String,
    modified: String,
    ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<PulseRow> for PulseRecord {
    fn from(row: PulseRow) -> Self {
        PulseRecord {
            pulse_id: row.pulse_id,
            name: row.name,
            description: row.description,
            created: row.created,
            modified: row.modified,
            ingested_at: row.ingested_at,
        }
    }
}
