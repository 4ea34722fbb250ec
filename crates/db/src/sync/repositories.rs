use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::source::models::SourcePartition;
use crate::sync::models::SyncJob;
use wellmap_common::error::WellmapResult;

#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    /// Open a job in `running` state for a partition.
    async fn create_running(
        &self,
        partition: &SourcePartition,
        started_at: DateTime<Utc>,
    ) -> WellmapResult<SyncJob>;

    /// Close a running job as `success` with its stats payload.
    /// Fails with `NotFound` if the job does not exist or is already closed.
    async fn mark_success(&self, id: Uuid, stats: &serde_json::Value) -> WellmapResult<SyncJob>;

    /// Close a running job as `failed` with the captured error text.
    /// Fails with `NotFound` if the job does not exist or is already closed.
    async fn mark_failed(&self, id: Uuid, error: &str) -> WellmapResult<SyncJob>;

    async fn get_by_id(&self, id: Uuid) -> WellmapResult<Option<SyncJob>>;
}

#[async_trait]
impl<T: SyncJobRepository + ?Sized> SyncJobRepository for Arc<T> {
    async fn create_running(
        &self,
        partition: &SourcePartition,
        started_at: DateTime<Utc>,
    ) -> WellmapResult<SyncJob> {
        (**self).create_running(partition, started_at).await
    }

    async fn mark_success(&self, id: Uuid, stats: &serde_json::Value) -> WellmapResult<SyncJob> {
        (**self).mark_success(id, stats).await
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> WellmapResult<SyncJob> {
        (**self).mark_failed(id, error).await
    }

    async fn get_by_id(&self, id: Uuid) -> WellmapResult<Option<SyncJob>> {
        (**self).get_by_id(id).await
    }
}
