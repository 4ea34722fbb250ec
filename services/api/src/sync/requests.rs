use serde::Deserialize;
use wellmap_common::types::SyncMode;

#[derive(Debug, Default, Deserialize)]
pub struct TriggerSyncRequest {
    pub mode: Option<String>,
}

impl TriggerSyncRequest {
    /// Anything other than a JSON object with a recognised `mode` means full.
    pub fn mode_from_body(body: &[u8]) -> SyncMode {
        let request: Self = serde_json::from_slice(body).unwrap_or_default();
        SyncMode::parse_or_full(request.mode.as_deref())
    }
}
