//! Pipeline tuning knobs.

use std::env;
use std::time::Duration;

/// Backoff schedule for retrying timed-out model calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following `attempt` (1-based), capped at
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on concurrent asset analyses per query.
    pub max_concurrent_analyses: usize,
    /// Minimum successfully analyzed assets required to proceed to the
    /// merge stage. Zero means a run with no usable assets still
    /// completes with a generated-only plan.
    pub min_successful_assets: usize,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            min_successful_assets: 0,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Build the config from environment variables, with defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_analyses: parse_env(
                "PIPELINE_MAX_CONCURRENT_ANALYSES",
                defaults.max_concurrent_analyses,
            )
            .max(1),
            min_successful_assets: parse_env(
                "PIPELINE_MIN_SUCCESSFUL_ASSETS",
                defaults.min_successful_assets,
            ),
            retry: RetryConfig {
                max_attempts: parse_env("PIPELINE_RETRY_MAX_ATTEMPTS", 3).max(1),
                ..RetryConfig::default()
            },
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
