use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::source::models::SourcePartition;
use crate::sync::models::{SyncJob, SyncJobStatus};
use crate::sync::repositories::SyncJobRepository;
use wellmap_common::error::{WellmapError, WellmapResult};

const RETURNING: &str =
    "returning id, source, source_layer, status, started_at, finished_at, stats, error";

#[derive(Clone)]
pub struct PgSyncJobRepository {
    pool: PgPool,
}

impl PgSyncJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: sqlx::postgres::PgRow) -> WellmapResult<SyncJob> {
        let status: String = row.get("status");
        Ok(SyncJob {
            id: row.get("id"),
            source: row.get("source"),
            source_layer: row.get("source_layer"),
            status: status.parse().map_err(WellmapError::Database)?,
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at"),
            stats: row.get("stats"),
            error: row.get("error"),
        })
    }

    fn closed_or_missing(id: Uuid) -> WellmapError {
        WellmapError::NotFound(format!("no running sync job {id}"))
    }
}

#[async_trait]
impl SyncJobRepository for PgSyncJobRepository {
    async fn create_running(
        &self,
        partition: &SourcePartition,
        started_at: DateTime<Utc>,
    ) -> WellmapResult<SyncJob> {
        let row = sqlx::query(&format!(
            "insert into sync_jobs (id, source, source_layer, status, started_at)
             values ($1, $2, $3, $4, $5)
             {RETURNING}"
        ))
        .bind(Uuid::new_v4())
        .bind(&partition.source)
        .bind(&partition.layer)
        .bind(SyncJobStatus::Running.as_str())
        .bind(started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_success(&self, id: Uuid, stats: &serde_json::Value) -> WellmapResult<SyncJob> {
        let row = sqlx::query(&format!(
            "update sync_jobs
             set status = $1, finished_at = $2, stats = $3, error = null
             where id = $4 and status = 'running'
             {RETURNING}"
        ))
        .bind(SyncJobStatus::Success.as_str())
        .bind(Utc::now())
        .bind(stats)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::map_row(r),
            None => Err(Self::closed_or_missing(id)),
        }
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> WellmapResult<SyncJob> {
        let row = sqlx::query(&format!(
            "update sync_jobs
             set status = $1, finished_at = $2, error = $3
             where id = $4 and status = 'running'
             {RETURNING}"
        ))
        .bind(SyncJobStatus::Failed.as_str())
        .bind(Utc::now())
        .bind(error)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::map_row(r),
            None => Err(Self::closed_or_missing(id)),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> WellmapResult<Option<SyncJob>> {
        let row = sqlx::query(
            "select id, source, source_layer, status, started_at, finished_at, stats, error
             from sync_jobs where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }
}
