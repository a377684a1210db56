use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// What the pipeline does with fetched records that do not fit in the buffer.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Hold the excess records and stop fetching until the buffer has room for them.
    #[default]
    Backpressure,
    /// Drop the excess records and count them as overflowed.
    Reject,
}

/// Batching and buffering configuration for pipelines.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Buffer length above which a batch of exactly this many records is flushed.
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    /// Maximum number of records held in the buffer at any time.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Behavior when a fetch returns more records than the buffer can hold.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    /// Time, in milliseconds, to wait before fetching again after an empty fetch.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
}

impl BatchConfig {
    /// Default flush threshold.
    pub const DEFAULT_FLUSH_THRESHOLD: usize = 10;

    /// Default buffer capacity.
    pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

    /// Default delay after an empty fetch in milliseconds.
    pub const DEFAULT_IDLE_DELAY_MS: u64 = 100;

    /// Returns the idle delay as a [`Duration`].
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    /// Validates batch configuration settings.
    ///
    /// Ensures the threshold is non-zero and that the capacity is strictly above it, otherwise a
    /// full buffer could never trigger a flush.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.flush_threshold == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.flush_threshold".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if self.buffer_capacity <= self.flush_threshold {
            return Err(ValidationError::CapacityNotAboveThreshold {
                capacity: self.buffer_capacity,
                threshold: self.flush_threshold,
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            buffer_capacity: default_buffer_capacity(),
            overflow_policy: OverflowPolicy::default(),
            idle_delay_ms: default_idle_delay_ms(),
        }
    }
}

fn default_flush_threshold() -> usize {
    BatchConfig::DEFAULT_FLUSH_THRESHOLD
}

fn default_buffer_capacity() -> usize {
    BatchConfig::DEFAULT_BUFFER_CAPACITY
}

fn default_idle_delay_ms() -> u64 {
    BatchConfig::DEFAULT_IDLE_DELAY_MS
}
