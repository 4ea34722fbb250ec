use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::env::{get_var_or, AppConfig};
use wellmap_common::error::{WellmapError, WellmapResult};

pub const DEFAULT_FEATURE_SERVICE_URL: &str =
    "https://gis.wsask.ca/arcgiswa/rest/services/WellsSite/WaterWellsPublic/FeatureServer/0";
pub const DEFAULT_SOURCE: &str = "WSA";
pub const DEFAULT_LAYER: &str = "WellsSite/WaterWellsPublic:0";

/// Settings for one source+layer synchronization.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub feature_service_url: String,
    pub source: String,
    pub layer: String,
    pub batch_size: NonZeroUsize,
    pub concurrency: NonZeroUsize,
    /// Attempts per batch, including the first one.
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feature_service_url: DEFAULT_FEATURE_SERVICE_URL.to_string(),
            source: DEFAULT_SOURCE.to_string(),
            layer: DEFAULT_LAYER.to_string(),
            batch_size: NonZeroUsize::new(500).unwrap_or(NonZeroUsize::MIN),
            concurrency: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            max_attempts: 2,
            retry_backoff_ms: 0,
            timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> WellmapResult<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let max_attempts: u32 = parse_var("SYNC_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(WellmapError::Config(
                "SYNC_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            feature_service_url: get_var_or("FEATURE_SERVICE_URL", &defaults.feature_service_url)
                .trim_end_matches('/')
                .to_string(),
            source: get_var_or("SYNC_SOURCE", &defaults.source),
            layer: get_var_or("SYNC_LAYER", &defaults.layer),
            batch_size: parse_var("SYNC_BATCH_SIZE", defaults.batch_size)?,
            concurrency: parse_var("SYNC_CONCURRENCY", defaults.concurrency)?,
            max_attempts,
            retry_backoff_ms: parse_var("SYNC_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            timeout_secs: parse_var("FEATURE_SERVICE_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }
}

/// Both settings are needed by every binary that runs a job.
pub fn load_all() -> WellmapResult<(AppConfig, SyncConfig)> {
    Ok((AppConfig::from_env()?, SyncConfig::from_env()?))
}

fn parse_var<T>(key: &str, default: T) -> WellmapResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| WellmapError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::ENV_LOCK;
    use std::env;

    const KEYS: &[&str] = &[
        "FEATURE_SERVICE_URL",
        "SYNC_SOURCE",
        "SYNC_LAYER",
        "SYNC_BATCH_SIZE",
        "SYNC_CONCURRENCY",
        "SYNC_MAX_ATTEMPTS",
        "SYNC_RETRY_BACKOFF_MS",
        "FEATURE_SERVICE_TIMEOUT_SECS",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_when_unset() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();

        let cfg = SyncConfig::from_env().expect("defaults should load");
        assert_eq!(cfg.feature_service_url, DEFAULT_FEATURE_SERVICE_URL);
        assert_eq!(cfg.source, "WSA");
        assert_eq!(cfg.layer, "WellsSite/WaterWellsPublic:0");
        assert_eq!(cfg.batch_size.get(), 500);
        assert_eq!(cfg.concurrency.get(), 2);
        assert_eq!(cfg.max_attempts, 2);
    }

    #[test]
    fn overrides_are_parsed() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("FEATURE_SERVICE_URL", "http://localhost:9000/layer/0/");
        env::set_var("SYNC_BATCH_SIZE", "50");
        env::set_var("SYNC_CONCURRENCY", "4");
        env::set_var("SYNC_RETRY_BACKOFF_MS", "250");

        let cfg = SyncConfig::from_env().expect("should load");
        assert_eq!(cfg.feature_service_url, "http://localhost:9000/layer/0");
        assert_eq!(cfg.batch_size.get(), 50);
        assert_eq!(cfg.concurrency.get(), 4);
        assert_eq!(cfg.retry_backoff_ms, 250);

        clear();
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("SYNC_BATCH_SIZE", "0");

        let err = SyncConfig::from_env().unwrap_err();
        assert!(matches!(err, WellmapError::Config(msg) if msg.contains("SYNC_BATCH_SIZE")));

        clear();
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("SYNC_MAX_ATTEMPTS", "0");

        assert!(SyncConfig::from_env().is_err());

        clear();
    }
}
