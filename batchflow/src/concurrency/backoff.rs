//! Exponential backoff shared by fetch and send retries.

use std::time::Duration;

use batchflow_config::shared::RetryConfig;
use rand::Rng;

/// Tracks consecutive failures of one operation and computes the delay before the next attempt.
///
/// The delay for the `n`-th consecutive failure is `initial_delay * multiplier^(n - 1)`, capped at
/// the configured maximum. When a jitter ratio is configured, a random share of up to that ratio
/// is added on top of the capped delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Records a failure and returns the delay to wait before retrying.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current_delay()
    }

    /// Returns how many consecutive failures were recorded since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Clears the failure streak after a successful attempt.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    fn current_delay(&self) -> Duration {
        let exponent = self.failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.config.backoff_multiplier.powi(exponent);
        let base_delay_ms = self.config.initial_delay_ms as f64 * multiplier;

        let max_delay_ms = self.config.max_delay_ms as f64;
        let capped_delay_ms = if base_delay_ms.is_finite() {
            base_delay_ms.min(max_delay_ms)
        } else {
            max_delay_ms
        };

        let delay_ms = if self.config.jitter_ratio > 0.0 {
            let jitter_factor = rand::rng().random::<f64>() * self.config.jitter_ratio;
            capped_delay_ms * (1.0 + jitter_factor)
        } else {
            capped_delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}
