use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::source::models::{SourcePartition, SourceRecord, SourceRecordUpsert};
use wellmap_common::error::WellmapResult;

#[async_trait]
pub trait SourceRecordRepository: Send + Sync {
    /// Insert or refresh one record keyed by (source, layer, objectid).
    /// On conflict overwrites the payload, advances `last_seen_at` and clears
    /// any soft delete.
    async fn upsert(
        &self,
        partition: &SourcePartition,
        record: &SourceRecordUpsert,
    ) -> WellmapResult<()>;

    /// Upsert records in order as one unit of work. Returns how many were written.
    async fn upsert_batch(
        &self,
        partition: &SourcePartition,
        records: &[SourceRecordUpsert],
    ) -> WellmapResult<usize> {
        for record in records {
            self.upsert(partition, record).await?;
        }
        Ok(records.len())
    }

    /// Object ids of every non-deleted record in the partition.
    async fn list_active_ids(&self, partition: &SourcePartition) -> WellmapResult<Vec<i64>>;

    /// Soft-delete active records whose `last_seen_at` is strictly before
    /// `job_started_at`. Returns the number of newly deleted records.
    async fn mark_stale(
        &self,
        partition: &SourcePartition,
        job_started_at: DateTime<Utc>,
    ) -> WellmapResult<u64>;

    async fn get(
        &self,
        partition: &SourcePartition,
        source_objectid: i64,
    ) -> WellmapResult<Option<SourceRecord>>;
}

#[async_trait]
impl<T: SourceRecordRepository + ?Sized> SourceRecordRepository for Arc<T> {
    async fn upsert(
        &self,
        partition: &SourcePartition,
        record: &SourceRecordUpsert,
    ) -> WellmapResult<()> {
        (**self).upsert(partition, record).await
    }

    async fn upsert_batch(
        &self,
        partition: &SourcePartition,
        records: &[SourceRecordUpsert],
    ) -> WellmapResult<usize> {
        (**self).upsert_batch(partition, records).await
    }

    async fn list_active_ids(&self, partition: &SourcePartition) -> WellmapResult<Vec<i64>> {
        (**self).list_active_ids(partition).await
    }

    async fn mark_stale(
        &self,
        partition: &SourcePartition,
        job_started_at: DateTime<Utc>,
    ) -> WellmapResult<u64> {
        (**self).mark_stale(partition, job_started_at).await
    }

    async fn get(
        &self,
        partition: &SourcePartition,
        source_objectid: i64,
    ) -> WellmapResult<Option<SourceRecord>> {
        (**self).get(partition, source_objectid).await
    }
}
