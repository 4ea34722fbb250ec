use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use wellmap_config::SyncConfig;

/// Delay inserted before each retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// `base * 2^(retry - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the `retry`-th retry (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => d,
            Self::Exponential { base, max } => {
                let factor = 1u32 << retry.saturating_sub(1).min(16);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    /// One retry, no delay.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        let backoff = match config.retry_backoff_ms {
            0 => Backoff::None,
            ms => Backoff::Fixed(Duration::from_millis(ms)),
        };
        Self {
            max_attempts: config.max_attempts,
            backoff,
        }
    }

    /// Run `op` until it succeeds or attempts are exhausted. The attempt
    /// number (1-based) is passed in; the last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        label,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
