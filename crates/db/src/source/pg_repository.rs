use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::source::models::{SourcePartition, SourceRecord, SourceRecordUpsert};
use crate::source::repositories::SourceRecordRepository;
use wellmap_common::error::{WellmapError, WellmapResult};

const UPSERT_SQL: &str = "insert into source_records
     (source, source_layer, source_objectid, raw_attributes, raw_geometry,
      latitude, longitude, source_updated_at, last_seen_at, is_deleted, deleted_at)
     values ($1, $2, $3, $4, $5, $6, $7, $8, $9, false, null)
     on conflict (source, source_layer, source_objectid) do update set
       raw_attributes = excluded.raw_attributes,
       raw_geometry = excluded.raw_geometry,
       latitude = excluded.latitude,
       longitude = excluded.longitude,
       source_updated_at = excluded.source_updated_at,
       last_seen_at = greatest(source_records.last_seen_at, excluded.last_seen_at),
       is_deleted = false,
       deleted_at = null,
       updated_at = now()";

#[derive(Clone)]
pub struct PgSourceRecordRepository {
    pool: PgPool,
}

impl PgSourceRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn upsert_query<'q>(
        partition: &'q SourcePartition,
        record: &'q SourceRecordUpsert,
    ) -> Query<'q, Postgres, PgArguments> {
        sqlx::query(UPSERT_SQL)
            .bind(&partition.source)
            .bind(&partition.layer)
            .bind(record.source_objectid)
            .bind(&record.raw_attributes)
            .bind(&record.raw_geometry)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(record.source_updated_at)
            .bind(record.seen_at)
    }

    fn map_row(row: PgRow) -> WellmapResult<SourceRecord> {
        Ok(SourceRecord {
            id: row.get("id"),
            source: row.get("source"),
            source_layer: row.get("source_layer"),
            source_objectid: row.get("source_objectid"),
            raw_attributes: row.get("raw_attributes"),
            raw_geometry: row.get("raw_geometry"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            source_updated_at: row.get("source_updated_at"),
            last_seen_at: row.get("last_seen_at"),
            is_deleted: row.get("is_deleted"),
            deleted_at: row.get("deleted_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl SourceRecordRepository for PgSourceRecordRepository {
    async fn upsert(
        &self,
        partition: &SourcePartition,
        record: &SourceRecordUpsert,
    ) -> WellmapResult<()> {
        Self::upsert_query(partition, record)
            .execute(&self.pool)
            .await
            .map_err(|e| WellmapError::Database(e.to_string()))?;
        Ok(())
    }

    async fn upsert_batch(
        &self,
        partition: &SourcePartition,
        records: &[SourceRecordUpsert],
    ) -> WellmapResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // One pooled connection per batch; dropping it returns it to the pool
        // on every exit path, including `?` below.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| WellmapError::Database(e.to_string()))?;

        for record in records {
            Self::upsert_query(partition, record)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    WellmapError::Database(format!(
                        "upsert of objectid {} failed: {e}",
                        record.source_objectid
                    ))
                })?;
        }

        Ok(records.len())
    }

    async fn list_active_ids(&self, partition: &SourcePartition) -> WellmapResult<Vec<i64>> {
        sqlx::query_scalar(
            "select source_objectid from source_records
             where source = $1 and source_layer = $2 and is_deleted = false",
        )
        .bind(&partition.source)
        .bind(&partition.layer)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))
    }

    async fn mark_stale(
        &self,
        partition: &SourcePartition,
        job_started_at: DateTime<Utc>,
    ) -> WellmapResult<u64> {
        let result = sqlx::query(
            "update source_records
             set is_deleted = true, deleted_at = now(), updated_at = now()
             where source = $1 and source_layer = $2
               and is_deleted = false and last_seen_at < $3",
        )
        .bind(&partition.source)
        .bind(&partition.layer)
        .bind(job_started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn get(
        &self,
        partition: &SourcePartition,
        source_objectid: i64,
    ) -> WellmapResult<Option<SourceRecord>> {
        let row = sqlx::query(
            "select id, source, source_layer, source_objectid, raw_attributes, raw_geometry,
                    latitude, longitude, source_updated_at, last_seen_at, is_deleted,
                    deleted_at, created_at, updated_at
             from source_records
             where source = $1 and source_layer = $2 and source_objectid = $3",
        )
        .bind(&partition.source)
        .bind(&partition.layer)
        .bind(source_objectid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WellmapError::Database(e.to_string()))?;

        row.map(Self::map_row).transpose()
    }
}
