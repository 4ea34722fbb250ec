use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::extractors::SyncAuthorized;
use crate::sync::requests::TriggerSyncRequest;
use crate::sync::responses::TriggerSyncResponse;
use crate::AppState;

/// Runs a sync job to completion inside the request.
pub async fn trigger_well_sync(
    State(state): State<AppState>,
    _auth: SyncAuthorized,
    body: Bytes,
) -> Result<Json<TriggerSyncResponse>, ApiError> {
    let mode = TriggerSyncRequest::mode_from_body(&body);
    tracing::info!(%mode, "sync triggered over http");

    let report = state.trigger.trigger(mode).await?;
    Ok(Json(report.into()))
}
