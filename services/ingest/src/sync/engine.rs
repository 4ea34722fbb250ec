use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use crate::arcgis::client::{FeatureServiceClient, FeatureSource};
use crate::sync::batch::chunk;
use crate::sync::diff::new_ids;
use crate::sync::report::{SyncFailure, SyncReport, SyncStats, INCREMENTAL_NOTE};
use crate::sync::retry::RetryPolicy;
use crate::sync::runner::BatchRunner;
use wellmap_common::error::{WellmapError, WellmapResult};
use wellmap_common::types::SyncMode;
use wellmap_config::SyncConfig;
use wellmap_db::source::models::SourcePartition;
use wellmap_db::source::pg_repository::PgSourceRecordRepository;
use wellmap_db::source::repositories::SourceRecordRepository;
use wellmap_db::sync::pg_repository::PgSyncJobRepository;
use wellmap_db::sync::repositories::SyncJobRepository;

/// Tuning knobs for a syncer.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub batch_size: NonZeroUsize,
    pub concurrency: NonZeroUsize,
    pub retry: RetryPolicy,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            retry: RetryPolicy::from_config(config),
        }
    }
}

/// Anything that can run a sync job on demand.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn trigger(&self, mode: SyncMode) -> Result<SyncReport, SyncFailure>;
}

/// Reconciles one remote layer into its `source_records` partition.
pub struct WellSyncer<C, R, J> {
    partition: SourcePartition,
    source: C,
    records: R,
    jobs: J,
    batch_size: NonZeroUsize,
    runner: BatchRunner,
}

impl<C, R, J> WellSyncer<C, R, J>
where
    C: FeatureSource,
    R: SourceRecordRepository,
    J: SyncJobRepository,
{
    pub fn new(
        partition: SourcePartition,
        source: C,
        records: R,
        jobs: J,
        settings: SyncSettings,
    ) -> Self {
        Self {
            partition,
            source,
            records,
            jobs,
            batch_size: settings.batch_size,
            runner: BatchRunner::new(settings.concurrency, settings.retry),
        }
    }

    pub fn partition(&self) -> &SourcePartition {
        &self.partition
    }

    /// Run one job end to end and record its outcome on the ledger.
    ///
    /// The job row is opened before any remote call and closed exactly once.
    /// Records written by completed batches are kept even when the job fails.
    pub async fn run(&self, mode: SyncMode) -> Result<SyncReport, SyncFailure> {
        // Postgres keeps microseconds; truncating keeps the stored watermark
        // equal to the value `mark_stale` compares against.
        let job_started_at = Utc::now().trunc_subsecs(6);

        let job = self
            .jobs
            .create_running(&self.partition, job_started_at)
            .await
            .map_err(|error| {
                tracing::error!(error = %error, partition = %self.partition, "could not open sync job");
                SyncFailure {
                    job_id: None,
                    error,
                }
            })?;

        tracing::info!(
            job_id = %job.id,
            %mode,
            partition = %self.partition,
            "sync job started"
        );

        // A failed success write falls through to `mark_failed` below.
        let outcome = match self.execute(mode, job_started_at).await {
            Ok(stats) => self
                .jobs
                .mark_success(job.id, &stats.to_json())
                .await
                .map(|_| stats),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(stats) => {
                tracing::info!(
                    job_id = %job.id,
                    %mode,
                    total_latest_ids = stats.total_latest_ids,
                    fetched = stats.fetched_features,
                    upserted = stats.upserted_source,
                    marked_deleted = stats.marked_deleted,
                    "sync job succeeded"
                );
                Ok(SyncReport {
                    job_id: job.id,
                    stats,
                })
            }
            Err(error) => {
                tracing::error!(job_id = %job.id, %mode, error = %error, "sync job failed");
                if let Err(e) = self.jobs.mark_failed(job.id, &error.to_string()).await {
                    tracing::error!(job_id = %job.id, error = %e, "could not record job failure");
                }
                Err(SyncFailure {
                    job_id: Some(job.id),
                    error,
                })
            }
        }
    }

    async fn execute(
        &self,
        mode: SyncMode,
        job_started_at: DateTime<Utc>,
    ) -> WellmapResult<SyncStats> {
        // Enumeration is never retried.
        let latest_ids = self.source.list_all_ids().await?;
        let total_latest_ids = latest_ids.len();
        tracing::info!(count = total_latest_ids, "enumerated remote ids");

        let (work_ids, new_count) = match mode {
            SyncMode::Full => (latest_ids, None),
            SyncMode::Incremental => {
                let local = self.records.list_active_ids(&self.partition).await?;
                let fresh = new_ids(&latest_ids, &local);
                tracing::info!(
                    local_active = local.len(),
                    new_ids = fresh.len(),
                    "computed incremental id diff"
                );
                let count = fresh.len();
                (fresh, Some(count))
            }
        };

        let batches = chunk(&work_ids, self.batch_size);
        let totals = self
            .runner
            .run(
                batches,
                &self.source,
                &self.records,
                &self.partition,
                job_started_at,
            )
            .await?;

        let marked_deleted = match mode {
            SyncMode::Full => {
                let marked = self
                    .records
                    .mark_stale(&self.partition, job_started_at)
                    .await?;
                tracing::info!(marked, "marked stale records deleted");
                marked
            }
            SyncMode::Incremental => 0,
        };

        Ok(SyncStats {
            mode,
            job_started_at,
            total_latest_ids,
            new_ids: new_count,
            fetched_features: totals.fetched,
            upserted_source: totals.upserted,
            skipped_features: totals.skipped,
            marked_deleted,
            batch_size: self.batch_size.get(),
            concurrency: self.runner.concurrency().get(),
            note: matches!(mode, SyncMode::Incremental).then(|| INCREMENTAL_NOTE.to_string()),
        })
    }
}

/// The production wiring: ArcGIS over HTTP into Postgres.
pub type PgWellSyncer =
    WellSyncer<FeatureServiceClient, PgSourceRecordRepository, PgSyncJobRepository>;

impl PgWellSyncer {
    pub fn from_pool(pool: sqlx::PgPool, config: &SyncConfig) -> WellmapResult<Self> {
        let client = FeatureServiceClient::new(config.into())
            .map_err(|e| WellmapError::Config(format!("http client: {e}")))?;
        Ok(WellSyncer::new(
            SourcePartition::new(config.source.clone(), config.layer.clone()),
            client,
            PgSourceRecordRepository::new(pool.clone()),
            PgSyncJobRepository::new(pool),
            SyncSettings::from(config),
        ))
    }
}

#[async_trait]
impl<C, R, J> SyncTrigger for WellSyncer<C, R, J>
where
    C: FeatureSource,
    R: SourceRecordRepository,
    J: SyncJobRepository,
{
    async fn trigger(&self, mode: SyncMode) -> Result<SyncReport, SyncFailure> {
        self.run(mode).await
    }
}
