//! Record source abstractions for batchflow pipelines.
//!
//! This module provides the [`Source`] trait implemented by everything the pipeline can pull
//! records from, together with an in-memory implementation used for tests and demos.

mod base;
pub mod memory;

pub use base::Source;
