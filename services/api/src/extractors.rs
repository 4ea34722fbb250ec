use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::AppState;

pub const SYNC_SECRET_HEADER: &str = "x-sync-secret";

/// Proof that the request carried the configured sync secret.
pub struct SyncAuthorized;

#[derive(Debug)]
pub struct SyncAuthRejection(&'static str);

impl IntoResponse for SyncAuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "ok": false, "error": self.0 });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for SyncAuthorized {
    type Rejection = SyncAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(SYNC_SECRET_HEADER)
            .ok_or(SyncAuthRejection("missing x-sync-secret header"))?;

        if !secrets_match(provided.as_bytes(), state.sync_secret.as_bytes()) {
            tracing::warn!("rejected sync trigger with wrong secret");
            return Err(SyncAuthRejection("Unauthorized"));
        }
        Ok(SyncAuthorized)
    }
}

/// Length leaks, contents do not.
fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.ct_eq(expected).into()
}
