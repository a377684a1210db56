//! Data destination abstractions for batchflow pipelines.
//!
//! This module provides the [`Destination`] trait that receives flushed batches, together with
//! an in-memory implementation used for tests and demos.

mod base;
pub mod memory;

pub use base::Destination;
