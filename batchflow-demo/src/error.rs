use std::io;

use batchflow::error::FlowError;
use batchflow_config::LoadConfigError;
use batchflow_config::shared::ValidationError;
use batchflow_telemetry::tracing::TracingError;
use thiserror::Error;

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;

/// Error type for the demo binary.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to load the configuration: {0}")]
    Config(#[from] LoadConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TracingError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("pipeline failed: {0}")]
    Pipeline(#[from] FlowError),
}
