use serde::Deserialize;
use std::env;
use wellmap_common::error::{WellmapError, WellmapResult};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub sync_secret: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> WellmapResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: get_var_or("PORT", "8080")
                .parse()
                .map_err(|e| WellmapError::Config(format!("invalid PORT: {e}")))?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            sync_secret: env::var("SYNC_SECRET").ok().filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The shared secret guarding the sync trigger. Missing is a configuration error.
    pub fn require_sync_secret(&self) -> WellmapResult<&str> {
        self.sync_secret
            .as_deref()
            .ok_or_else(|| WellmapError::Config("SYNC_SECRET is required but not set".to_string()))
    }
}

pub(crate) fn get_var(key: &str) -> WellmapResult<String> {
    env::var(key).map_err(|_| WellmapError::Config(format!("{key} is required but not set")))
}

pub(crate) fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
