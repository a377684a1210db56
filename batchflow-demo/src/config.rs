use std::path::PathBuf;
use std::time::Duration;

use batchflow_config::shared::PipelineConfig;
use batchflow_config::{Config, load_config};
use serde::Deserialize;

use crate::error::DemoResult;

/// Configuration of the demo binary.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// File receiving one JSON object per delivered record, created if missing.
    pub output_path: PathBuf,
    /// Maximum number of stdin lines returned by a single fetch.
    #[serde(default = "default_max_records_per_fetch")]
    pub max_records_per_fetch: usize,
    /// How long a fetch waits for more lines once it has at least one.
    #[serde(default = "default_fetch_linger_ms")]
    pub fetch_linger_ms: u64,
    pub pipeline: PipelineConfig,
}

impl DemoConfig {
    pub fn fetch_linger(&self) -> Duration {
        Duration::from_millis(self.fetch_linger_ms)
    }
}

impl Config for DemoConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

fn default_max_records_per_fetch() -> usize {
    100
}

fn default_fetch_linger_ms() -> u64 {
    50
}

/// Loads and validates the demo configuration.
pub fn load_demo_config() -> DemoResult<DemoConfig> {
    let config = load_config::<DemoConfig>()?;
    config.pipeline.validate()?;

    Ok(config)
}
