use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{BatchConfig, RetryConfig, ValidationError};

/// Configuration for a batchflow pipeline.
///
/// Contains the batching parameters used by the buffer and the retry parameters used when the
/// source or the destination fail transiently.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// The identifier of this pipeline, attached to every log line it emits.
    #[serde(default)]
    pub id: u64,
    /// Batch processing configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Retry and backoff configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.batch.validate()?;
        self.retry.validate()?;

        Ok(())
    }
}

impl Config for PipelineConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
