use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A field holds a value outside of its allowed range.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// The buffer capacity must leave room for at least one full batch above the threshold.
    #[error(
        "`batch.buffer_capacity` ({capacity}) must be greater than `batch.flush_threshold` ({threshold})"
    )]
    CapacityNotAboveThreshold { capacity: usize, threshold: usize },
    /// The initial retry delay cannot exceed the maximum retry delay.
    #[error(
        "`retry.initial_delay_ms` ({initial_delay_ms}) cannot be greater than `retry.max_delay_ms` ({max_delay_ms})"
    )]
    InitialDelayAboveMax {
        initial_delay_ms: u64,
        max_delay_ms: u64,
    },
    /// Maximum send attempts cannot be zero.
    #[error("`retry.max_attempts` cannot be zero")]
    MaxAttemptsZero,
}
