use serde::Serialize;
use uuid::Uuid;
use wellmap_ingest::sync::report::{SyncReport, SyncStats};

#[derive(Debug, Serialize)]
pub struct TriggerSyncResponse {
    pub ok: bool,
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub result: SyncStats,
}

impl From<SyncReport> for TriggerSyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            ok: true,
            job_id: report.job_id,
            result: report.stats,
        }
    }
}
