//! Bounded-batch data pipelines.
//!
//! A [`pipeline::Pipeline`] pulls [`types::Record`]s from a [`source::Source`], accumulates them
//! in a bounded [`buffer::BatchBuffer`] and flushes fixed-size batches to a
//! [`destination::Destination`], until it is stopped, the source is exhausted or a fatal error
//! occurs. Transient failures are retried with exponential backoff, batches refused by the
//! destination are dropped and reported, and the progress is always observable through
//! [`state::PipelineStatus`].

pub mod buffer;
pub mod concurrency;
pub mod destination;
pub mod error;
#[cfg(feature = "failpoints")]
pub mod failpoints;
mod macros;
pub mod pipeline;
pub mod reporter;
pub mod source;
pub mod state;
pub mod types;
pub mod workers;
