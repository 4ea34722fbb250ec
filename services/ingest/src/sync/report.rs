use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellmap_common::error::WellmapError;
use wellmap_common::types::SyncMode;

pub const INCREMENTAL_NOTE: &str =
    "Incremental only upserts NEW ids. Use full sync periodically for updates + deletion detection.";

/// Summary stored on the job row and returned to the trigger caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub mode: SyncMode,
    #[serde(rename = "jobStartedAt")]
    pub job_started_at: DateTime<Utc>,
    pub total_latest_ids: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_ids: Option<usize>,
    pub fetched_features: usize,
    pub upserted_source: usize,
    /// Features dropped because they carried no `OBJECTID`.
    pub skipped_features: usize,
    pub marked_deleted: u64,
    pub batch_size: usize,
    pub concurrency: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SyncStats {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A job that reached `success`.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub job_id: Uuid,
    pub stats: SyncStats,
}

/// A job that failed. `job_id` is `None` only if the ledger row could not be created.
#[derive(Debug, thiserror::Error)]
#[error("sync job failed: {error}")]
pub struct SyncFailure {
    pub job_id: Option<Uuid>,
    #[source]
    pub error: WellmapError,
}
