//! Configuration types and loading for batchflow pipelines.
//!
//! The [`shared`] module holds the configuration structures consumed by the pipeline controller,
//! while [`load`] provides hierarchical loading from files and environment variables.

pub mod environment;
pub mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config};
