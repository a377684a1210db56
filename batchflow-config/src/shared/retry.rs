use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for retrying transient source and destination failures.
///
/// The same backoff shape is used for failed fetches and failed sends. Fetch retries are
/// unbounded, while send retries are capped by [`RetryConfig::max_attempts`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 500ms
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries.
    ///
    /// The backoff algorithm will not exceed this delay.
    /// Default: 30000ms (30 seconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff between attempts.
    ///
    /// After each failed attempt, the delay is multiplied by this value.
    /// Must be >= 1.0.
    /// Default: 2.0
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound of the random jitter added on top of each delay, as a ratio of the delay.
    ///
    /// Must be within `[0.0, 1.0]`.
    /// Default: 0.0 (no jitter)
    #[serde(default)]
    pub jitter_ratio: f64,

    /// Maximum number of send attempts for a single batch before the pipeline fails.
    ///
    /// Default: 5
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_ratio: 0.0,
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryConfig {
    /// Returns the initial retry delay as a Duration.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Returns the maximum retry delay as a Duration.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Validates retry configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MaxAttemptsZero);
        }

        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "retry.backoff_multiplier".to_string(),
                constraint: "must be greater than or equal to 1.0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ValidationError::InvalidFieldValue {
                field: "retry.jitter_ratio".to_string(),
                constraint: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ValidationError::InitialDelayAboveMax {
                initial_delay_ms: self.initial_delay_ms,
                max_delay_ms: self.max_delay_ms,
            });
        }

        Ok(())
    }
}
