//! Bounded retry with exponential backoff for timed-out model calls.

use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::StageError;

/// Run `op` up to `config.max_attempts` times.
///
/// Only [`StageError::UpstreamTimeout`] is retried; every other error
/// (and success) returns immediately. The last timeout surfaces to the
/// caller once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, StageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_for(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, %err, "retrying timed-out model call");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
