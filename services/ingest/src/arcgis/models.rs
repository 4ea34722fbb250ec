use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Attribute holding the layer's primary key.
pub const OBJECT_ID_FIELD: &str = "OBJECTID";

/// Error envelope the service returns, sometimes with HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcGisError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ArcGisError {
    pub fn describe(&self) -> String {
        let code = self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string());
        let message = self.message.as_deref().unwrap_or("unknown error");
        if self.details.is_empty() {
            format!("{code}: {message}")
        } else {
            format!("{code}: {message} ({})", self.details.join("; "))
        }
    }
}

/// Body of `query?returnIdsOnly=true`.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectIdsResponse {
    #[serde(rename = "objectIdFieldName", default)]
    pub object_id_field_name: Option<String>,
    #[serde(rename = "objectIds", default)]
    pub object_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub error: Option<ArcGisError>,
}

/// Body of `query?objectIds=...&outFields=*`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureQueryResponse {
    /// Entries that are not feature objects decode as an empty feature, which
    /// has no `OBJECTID` and is skipped downstream.
    #[serde(default, deserialize_with = "lenient_features")]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub error: Option<ArcGisError>,
}

/// One feature as returned by the service. Both halves stay opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
}

impl Feature {
    /// `OBJECTID` as an integer, if present and numeric.
    pub fn object_id(&self) -> Option<i64> {
        self.attributes.get(OBJECT_ID_FIELD).and_then(Value::as_i64)
    }

    /// `(latitude, longitude)` from a point geometry in WGS84 (`y`, `x`).
    pub fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        let Some(geometry) = self.geometry.as_ref() else {
            return (None, None);
        };
        let lat = geometry.get("y").and_then(Value::as_f64);
        let lng = geometry.get("x").and_then(Value::as_f64);
        (lat, lng)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_features<'de, D>(deserializer: D) -> Result<Vec<Feature>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| Feature::deserialize(entry).unwrap_or_default())
        .collect())
}
