//! Lifecycle state and counters of a running pipeline.
//!
//! The flush worker is the only writer. Callers read consistent snapshots through
//! [`PipelineStatusHandle`] without blocking the worker.

mod status;

pub use status::*;
