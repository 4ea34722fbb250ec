//! In-memory stand-ins for the remote layer and the Postgres repositories.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::arcgis::client::FeatureSource;
use crate::arcgis::models::{Feature, FeatureQueryResponse};
use wellmap_common::error::{WellmapError, WellmapResult};
use wellmap_db::source::models::{SourcePartition, SourceRecord, SourceRecordUpsert};
use wellmap_db::source::repositories::SourceRecordRepository;
use wellmap_db::sync::models::{SyncJob, SyncJobStatus};
use wellmap_db::sync::repositories::SyncJobRepository;

/// Feature for `id` with a point geometry derived from the id.
pub(crate) fn feature(id: i64) -> Feature {
    let offset = (id % 10) as f64;
    serde_json::from_value(json!({
        "attributes": { "OBJECTID": id, "WellName": format!("WELL {id}") },
        "geometry": { "x": -101.0 - offset, "y": 49.0 + offset * 0.5 }
    }))
    .expect("valid feature json")
}

// -- Scripted FeatureSource --

#[derive(Default)]
pub(crate) struct ScriptedSource {
    ids: Vec<i64>,
    ids_error: Option<String>,
    fetch_failures: AtomicU32,
    always_fail_on: Option<i64>,
    anonymous_feature: bool,
    malformed_features: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    pub(crate) fn with_ids(ids: Vec<i64>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    pub(crate) fn failing_ids(message: &str) -> Self {
        Self {
            ids_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// The next `n` fetch calls fail, whichever batch they belong to.
    pub(crate) fn failing_fetches(self, n: u32) -> Self {
        self.fetch_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Every fetch of a batch containing `id` fails.
    pub(crate) fn always_failing_on(mut self, id: i64) -> Self {
        self.always_fail_on = Some(id);
        self
    }

    /// Each response also carries one feature with no `OBJECTID`.
    pub(crate) fn with_anonymous_feature(mut self) -> Self {
        self.anonymous_feature = true;
        self
    }

    /// Each response also carries a `null` entry and a feature with `null` attributes.
    pub(crate) fn with_malformed_features(mut self) -> Self {
        self.malformed_features = true;
        self
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every id requested by a successful fetch, in call order.
    pub(crate) fn fetched_ids(&self) -> Vec<i64> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureSource for ScriptedSource {
    async fn list_all_ids(&self) -> WellmapResult<Vec<i64>> {
        if let Some(msg) = &self.ids_error {
            return Err(WellmapError::Upstream(msg.clone()));
        }
        if self.ids.is_empty() {
            return Err(WellmapError::EmptyResult("no objectIds returned".to_string()));
        }
        Ok(self.ids.clone())
    }

    async fn fetch_features(&self, ids: &[i64]) -> WellmapResult<Vec<Feature>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail_now = self
            .fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail_now {
            return Err(WellmapError::Upstream("HTTP 502: scripted".to_string()));
        }
        if matches!(self.always_fail_on, Some(bad) if ids.contains(&bad)) {
            return Err(WellmapError::Upstream("HTTP 500: scripted".to_string()));
        }

        self.fetched.lock().unwrap().extend_from_slice(ids);
        let mut features: Vec<Feature> = ids
            .iter()
            .filter(|id| self.ids.contains(id))
            .map(|id| feature(*id))
            .collect();
        if self.anonymous_feature {
            features.push(
                serde_json::from_value(json!({ "attributes": { "WellName": "?" } })).unwrap(),
            );
        }
        if self.malformed_features {
            let body: FeatureQueryResponse = serde_json::from_value(json!({
                "features": [null, { "attributes": null, "geometry": null }]
            }))
            .unwrap();
            features.extend(body.features);
        }
        Ok(features)
    }
}

// -- In-memory SourceRecordRepository --

#[derive(Default)]
pub(crate) struct MemorySourceRepo {
    rows: Mutex<HashMap<(SourcePartition, i64), SourceRecord>>,
    upsert_failures: AtomicU32,
    upserted: Mutex<Vec<i64>>,
    next_id: AtomicUsize,
}

impl MemorySourceRepo {
    pub(crate) fn failing_upserts(self, n: u32) -> Self {
        self.upsert_failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn seed(
        &self,
        partition: &SourcePartition,
        id: i64,
        last_seen_at: DateTime<Utc>,
        is_deleted: bool,
    ) {
        let record = SourceRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) as i64,
            source: partition.source.clone(),
            source_layer: partition.layer.clone(),
            source_objectid: id,
            raw_attributes: json!({ "OBJECTID": id, "WellName": "seeded" }),
            raw_geometry: None,
            latitude: None,
            longitude: None,
            source_updated_at: None,
            last_seen_at,
            is_deleted,
            deleted_at: is_deleted.then_some(last_seen_at),
            created_at: last_seen_at,
            updated_at: last_seen_at,
        };
        self.rows
            .lock()
            .unwrap()
            .insert((partition.clone(), id), record);
    }

    pub(crate) fn record(&self, partition: &SourcePartition, id: i64) -> Option<SourceRecord> {
        self.rows
            .lock()
            .unwrap()
            .get(&(partition.clone(), id))
            .cloned()
    }

    pub(crate) fn active_ids(&self, partition: &SourcePartition) -> Vec<i64> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.source == partition.source && r.source_layer == partition.layer && !r.is_deleted
            })
            .map(|r| r.source_objectid)
            .collect()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Object ids passed to `upsert`, in call order.
    pub(crate) fn upserted_ids(&self) -> Vec<i64> {
        self.upserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceRecordRepository for MemorySourceRepo {
    async fn upsert(
        &self,
        partition: &SourcePartition,
        record: &SourceRecordUpsert,
    ) -> WellmapResult<()> {
        let fail_now = self
            .upsert_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail_now {
            return Err(WellmapError::Database("scripted upsert failure".to_string()));
        }

        self.upserted.lock().unwrap().push(record.source_objectid);
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let key = (partition.clone(), record.source_objectid);
        match rows.get_mut(&key) {
            Some(existing) => {
                existing.raw_attributes = record.raw_attributes.clone();
                existing.raw_geometry = record.raw_geometry.clone();
                existing.latitude = record.latitude;
                existing.longitude = record.longitude;
                existing.source_updated_at = record.source_updated_at;
                existing.last_seen_at = existing.last_seen_at.max(record.seen_at);
                existing.is_deleted = false;
                existing.deleted_at = None;
                existing.updated_at = now;
            }
            None => {
                let row = SourceRecord {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) as i64,
                    source: partition.source.clone(),
                    source_layer: partition.layer.clone(),
                    source_objectid: record.source_objectid,
                    raw_attributes: record.raw_attributes.clone(),
                    raw_geometry: record.raw_geometry.clone(),
                    latitude: record.latitude,
                    longitude: record.longitude,
                    source_updated_at: record.source_updated_at,
                    last_seen_at: record.seen_at,
                    is_deleted: false,
                    deleted_at: None,
                    created_at: now,
                    updated_at: now,
                };
                rows.insert(key, row);
            }
        }
        Ok(())
    }

    async fn list_active_ids(&self, partition: &SourcePartition) -> WellmapResult<Vec<i64>> {
        Ok(self.active_ids(partition))
    }

    async fn mark_stale(
        &self,
        partition: &SourcePartition,
        job_started_at: DateTime<Utc>,
    ) -> WellmapResult<u64> {
        let now = Utc::now();
        let mut marked = 0;
        for row in self.rows.lock().unwrap().values_mut() {
            if row.source == partition.source
                && row.source_layer == partition.layer
                && !row.is_deleted
                && row.last_seen_at < job_started_at
            {
                row.is_deleted = true;
                row.deleted_at = Some(now);
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn get(
        &self,
        partition: &SourcePartition,
        source_objectid: i64,
    ) -> WellmapResult<Option<SourceRecord>> {
        Ok(self.record(partition, source_objectid))
    }
}

// -- In-memory SyncJobRepository --

#[derive(Default)]
pub(crate) struct MemoryJobRepo {
    jobs: Mutex<HashMap<Uuid, SyncJob>>,
    fail_create: bool,
    fail_success: bool,
}

impl MemoryJobRepo {
    pub(crate) fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_success() -> Self {
        Self {
            fail_success: true,
            ..Self::default()
        }
    }

    pub(crate) fn job(&self, id: Uuid) -> Option<SyncJob> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn close(
        &self,
        id: Uuid,
        status: SyncJobStatus,
        stats: Option<serde_json::Value>,
        error: Option<String>,
    ) -> WellmapResult<SyncJob> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status == SyncJobStatus::Running => {
                job.status = status;
                job.finished_at = Some(Utc::now());
                job.stats = stats;
                job.error = error;
                Ok(job.clone())
            }
            _ => Err(WellmapError::NotFound(format!("no running sync job {id}"))),
        }
    }
}

#[async_trait]
impl SyncJobRepository for MemoryJobRepo {
    async fn create_running(
        &self,
        partition: &SourcePartition,
        started_at: DateTime<Utc>,
    ) -> WellmapResult<SyncJob> {
        if self.fail_create {
            return Err(WellmapError::Database("connection refused".to_string()));
        }
        let job = SyncJob {
            id: Uuid::new_v4(),
            source: partition.source.clone(),
            source_layer: partition.layer.clone(),
            status: SyncJobStatus::Running,
            started_at,
            finished_at: None,
            stats: None,
            error: None,
        };
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(job)
    }

    async fn mark_success(&self, id: Uuid, stats: &serde_json::Value) -> WellmapResult<SyncJob> {
        if self.fail_success {
            return Err(WellmapError::Database("stats write refused".to_string()));
        }
        self.close(id, SyncJobStatus::Success, Some(stats.clone()), None)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> WellmapResult<SyncJob> {
        self.close(id, SyncJobStatus::Failed, None, Some(error.to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> WellmapResult<Option<SyncJob>> {
        Ok(self.job(id))
    }
}
