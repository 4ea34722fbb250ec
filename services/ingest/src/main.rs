use std::process::ExitCode;

use wellmap_common::types::SyncMode;
use wellmap_config::{init_tracing, load_all};
use wellmap_ingest::sync::engine::PgWellSyncer;

/// One-shot sync. Mode comes from the first argument, then `SYNC_MODE`, else full.
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("info");

    let (config, sync_config) = load_all().expect("failed to load config");
    let arg = std::env::args().nth(1).or_else(|| std::env::var("SYNC_MODE").ok());
    let mode = SyncMode::parse_or_full(arg.as_deref());
    tracing::info!(service = "wellmap-ingest", %mode, "starting");

    let pool = wellmap_db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");
    wellmap_db::run_migrations(&pool)
        .await
        .expect("failed to apply migrations");

    let syncer = PgWellSyncer::from_pool(pool, &sync_config).expect("failed to build syncer");

    match syncer.run(mode).await {
        Ok(report) => {
            tracing::info!(
                job_id = %report.job_id,
                stats = %report.stats.to_json(),
                "sync finished"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            let job_id = failure.job_id.map(|id| id.to_string()).unwrap_or_default();
            tracing::error!(%job_id, error = %failure.error, "sync failed");
            ExitCode::FAILURE
        }
    }
}
