use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{Feature, FeatureQueryResponse, ObjectIdsResponse};
use wellmap_common::error::{WellmapError, WellmapResult};
use wellmap_config::SyncConfig;

#[derive(Debug, Clone)]
pub struct FeatureServiceConfig {
    /// Layer URL, e.g. `.../FeatureServer/0`, without a trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl From<&SyncConfig> for FeatureServiceConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_url: config.feature_service_url.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeatureServiceError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Decode(String),

    #[error("feature service reported error {0}")]
    Service(String),

    #[error("no objectIds returned")]
    EmptyIds,
}

impl From<FeatureServiceError> for WellmapError {
    fn from(err: FeatureServiceError) -> Self {
        match err {
            FeatureServiceError::EmptyIds => WellmapError::EmptyResult(err.to_string()),
            other => WellmapError::Upstream(other.to_string()),
        }
    }
}

/// The two remote reads the engine needs.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Every object id currently in the layer, in service order.
    async fn list_all_ids(&self) -> WellmapResult<Vec<i64>>;

    /// Full attributes and geometry for the given ids.
    async fn fetch_features(&self, ids: &[i64]) -> WellmapResult<Vec<Feature>>;
}

#[derive(Clone)]
pub struct FeatureServiceClient {
    client: Client,
    config: FeatureServiceConfig,
}

impl FeatureServiceClient {
    pub fn new(config: FeatureServiceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: create a client pointing at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.config.base_url)
    }

    /// One call to the ids-only endpoint. Zero ids is treated as an anomaly.
    pub async fn query_object_ids(&self) -> Result<Vec<i64>, FeatureServiceError> {
        let body: ObjectIdsResponse = self
            .get_json(&[("where", "1=1"), ("returnIdsOnly", "true"), ("f", "json")])
            .await?;

        if let Some(err) = body.error {
            return Err(FeatureServiceError::Service(err.describe()));
        }

        match body.object_ids {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(FeatureServiceError::EmptyIds),
        }
    }

    /// One call filtered by `objectIds`, returning WGS84 geometry.
    pub async fn query_features(&self, ids: &[i64]) -> Result<Vec<Feature>, FeatureServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let csv = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let body: FeatureQueryResponse = self
            .get_json(&[
                ("objectIds", csv.as_str()),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("outSR", "4326"),
                ("f", "json"),
            ])
            .await?;

        if let Some(err) = body.error {
            return Err(FeatureServiceError::Service(err.describe()));
        }

        Ok(body.features)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, FeatureServiceError> {
        let response = self
            .client
            .get(self.query_url())
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeatureServiceError::HttpError { status, body });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FeatureServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FeatureSource for FeatureServiceClient {
    async fn list_all_ids(&self) -> WellmapResult<Vec<i64>> {
        Ok(self.query_object_ids().await?)
    }

    async fn fetch_features(&self, ids: &[i64]) -> WellmapResult<Vec<Feature>> {
        Ok(self.query_features(ids).await?)
    }
}
