use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One remote source+layer pair. Each partition owns a disjoint slice of
/// `source_records`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePartition {
    pub source: String,
    pub layer: String,
}

impl SourcePartition {
    pub fn new(source: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            layer: layer.into(),
        }
    }
}

impl fmt::Display for SourcePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.layer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: i64,
    pub source: String,
    pub source_layer: String,
    pub source_objectid: i64,
    pub raw_attributes: Value,
    pub raw_geometry: Option<Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceRecord {
    /// Typed view over the attributes the map and listing pages read.
    pub fn well_attributes(&self) -> WellAttributes {
        WellAttributes::from_raw(&self.raw_attributes)
    }
}

/// Write payload for one fetched feature, keyed by `source_objectid` within a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecordUpsert {
    pub source_objectid: i64,
    pub raw_attributes: Value,
    pub raw_geometry: Option<Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source_updated_at: Option<DateTime<Utc>>,
    /// Start time of the job that fetched this feature; becomes `last_seen_at`.
    pub seen_at: DateTime<Utc>,
}

/// Partial, read-only view of a water well's `raw_attributes`.
///
/// The remote service owns the schema; everything here is optional and
/// unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WellAttributes {
    #[serde(rename = "WellName", default, deserialize_with = "lenient_string")]
    pub well_name: Option<String>,
    #[serde(rename = "cLandLocationDisplay", default, deserialize_with = "lenient_string")]
    pub land_location: Option<String>,
    #[serde(rename = "cHoleNumber", default, deserialize_with = "lenient_string")]
    pub hole_number: Option<String>,
    #[serde(rename = "cDecommisioned", default, deserialize_with = "lenient_string")]
    pub decommissioned_flag: Option<String>,
    #[serde(rename = "dDateDecommisioned", default, deserialize_with = "lenient_string")]
    pub date_decommissioned: Option<String>,
}

const NEVER_DECOMMISSIONED_DATE: &str = "1900.01.01";

impl WellAttributes {
    pub fn from_raw(raw: &Value) -> Self {
        Self::deserialize(raw).unwrap_or_default()
    }

    /// A well counts as decommissioned when its flag is `1` or it carries a
    /// real decommission date (the service uses `1900.01.01` as "none").
    pub fn is_decommissioned(&self) -> bool {
        let flagged = self.decommissioned_flag.as_deref() == Some("1");
        let dated = matches!(
            self.date_decommissioned.as_deref(),
            Some(d) if !d.is_empty() && d != NEVER_DECOMMISSIONED_DATE
        );
        flagged || dated
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(if b { "1" } else { "0" }.to_string()),
        _ => None,
    })
}
