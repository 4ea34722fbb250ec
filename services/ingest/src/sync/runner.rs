use std::num::NonZeroUsize;
use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::arcgis::client::FeatureSource;
use crate::arcgis::models::Feature;
use crate::sync::retry::RetryPolicy;
use wellmap_common::error::WellmapResult;
use wellmap_db::source::models::{SourcePartition, SourceRecordUpsert};
use wellmap_db::source::repositories::SourceRecordRepository;

/// Counters for completed batches. Workers report one of these per batch and
/// the collector in [`BatchRunner::run`] is the only writer of the total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchTotals {
    pub batches: usize,
    pub fetched: usize,
    pub upserted: usize,
    pub skipped: usize,
    /// Batches that needed more than one attempt.
    pub retried: usize,
}

impl AddAssign for BatchTotals {
    fn add_assign(&mut self, other: Self) {
        self.batches += other.batches;
        self.fetched += other.fetched;
        self.upserted += other.upserted;
        self.skipped += other.skipped;
        self.retried += other.retried;
    }
}

/// Build the write payload for a fetched feature. `None` when it has no `OBJECTID`.
pub fn to_upsert(feature: &Feature, seen_at: DateTime<Utc>) -> Option<SourceRecordUpsert> {
    let source_objectid = feature.object_id()?;
    let (latitude, longitude) = feature.coordinates();

    Some(SourceRecordUpsert {
        source_objectid,
        raw_attributes: serde_json::Value::Object(feature.attributes.clone()),
        raw_geometry: feature.geometry.clone(),
        latitude,
        longitude,
        source_updated_at: None,
        seen_at,
    })
}

/// Drains batches through a fixed number of concurrent workers, each doing
/// fetch then upsert, with the whole cycle retried per [`RetryPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    concurrency: NonZeroUsize,
    retry: RetryPolicy,
}

impl BatchRunner {
    pub fn new(concurrency: NonZeroUsize, retry: RetryPolicy) -> Self {
        Self { concurrency, retry }
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Returns once every batch has completed, or with the first batch error
    /// that survived its retries. Batches finished before that stay written.
    pub async fn run<S, R>(
        &self,
        batches: Vec<Vec<i64>>,
        source: &S,
        repo: &R,
        partition: &SourcePartition,
        seen_at: DateTime<Utc>,
    ) -> WellmapResult<BatchTotals>
    where
        S: FeatureSource + ?Sized,
        R: SourceRecordRepository + ?Sized,
    {
        let batch_count = batches.len();
        let retry = self.retry;

        let mut reports = stream::iter(batches.into_iter().enumerate())
            .map(|(index, ids)| async move {
                let result = retry
                    .run("sync batch", |attempt| {
                        process_batch(source, repo, partition, &ids, seen_at, attempt)
                    })
                    .await;
                if let Err(e) = &result {
                    tracing::error!(batch = index, size = ids.len(), error = %e, "batch failed after retries");
                }
                result
            })
            .buffer_unordered(self.concurrency.get());

        let mut totals = BatchTotals::default();
        while let Some(report) = reports.next().await {
            totals += report?;
        }

        tracing::info!(
            batches = batch_count,
            fetched = totals.fetched,
            upserted = totals.upserted,
            skipped = totals.skipped,
            retried = totals.retried,
            "all batches completed"
        );
        Ok(totals)
    }
}

async fn process_batch<S, R>(
    source: &S,
    repo: &R,
    partition: &SourcePartition,
    ids: &[i64],
    seen_at: DateTime<Utc>,
    attempt: u32,
) -> WellmapResult<BatchTotals>
where
    S: FeatureSource + ?Sized,
    R: SourceRecordRepository + ?Sized,
{
    let features = source.fetch_features(ids).await?;

    let mut records = Vec::with_capacity(features.len());
    let mut skipped = 0;
    for feature in &features {
        match to_upsert(feature, seen_at) {
            Some(record) => records.push(record),
            None => {
                tracing::debug!(attributes = ?feature.attributes, "skipping feature without OBJECTID");
                skipped += 1;
            }
        }
    }

    let upserted = repo.upsert_batch(partition, &records).await?;

    Ok(BatchTotals {
        batches: 1,
        fetched: features.len(),
        upserted,
        skipped,
        retried: usize::from(attempt > 1),
    })
}
