use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::metrics::CAS_CONFLICTS_TOTAL;

#[derive(Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

/// Runs a read-merge-conditional-write operation, retrying on
/// `AppError::VersionConflict` with exponential backoff and jitter.
///
/// Any other error propagates immediately. When the attempt budget is
/// exhausted the conflict is surfaced as `StoreUnavailable` so callers see a
/// retryable infrastructure failure rather than the internal CAS signal.
pub async fn retry_conflicts<F, Fut, T>(config: RetryConfig, collection: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = AppResult<T>>,
{
    let mut backoff = config.base_backoff;
    let mut attempts_left = config.max_attempts;

    loop {
        match op().await {
            Err(AppError::VersionConflict) => {
                CAS_CONFLICTS_TOTAL.with_label_values(&[collection]).inc();
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 {
                    tracing::warn!(collection, "conditional write retry budget exhausted");
                    return Err(AppError::StoreUnavailable(format!(
                        "too many concurrent updates on {}",
                        collection
                    )));
                }

                let wait = match config.jitter_max {
                    Some(jitter_max) => {
                        let jitter_ms = jitter_max.as_millis() as u64;
                        let extra = if jitter_ms == 0 {
                            0
                        } else {
                            rand::random::<u64>() % (jitter_ms + 1)
                        };
                        backoff + Duration::from_millis(extra)
                    }
                    None => backoff,
                };
                tokio::time::sleep(wait).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
            other => return other,
        }
    }
}
