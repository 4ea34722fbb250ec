use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;
use wellmap_common::error::WellmapError;
use wellmap_ingest::sync::report::SyncFailure;

/// Error body shared by every handler: `{ ok: false, jobId, error }`, always 500.
pub struct ApiError {
    pub job_id: Option<Uuid>,
    pub error: WellmapError,
}

impl From<WellmapError> for ApiError {
    fn from(error: WellmapError) -> Self {
        Self {
            job_id: None,
            error,
        }
    }
}

impl From<SyncFailure> for ApiError {
    fn from(failure: SyncFailure) -> Self {
        Self {
            job_id: failure.job_id,
            error: failure.error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "ok": false,
            "jobId": self.job_id,
            "error": self.error.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
