//! Concurrency utilities used by the flush worker.
//!
//! The [`shutdown`] module implements the stop signal observed by the worker at every suspension
//! point: while fetching, while waiting for a retry delay and before each send. A send that is
//! already in flight is never interrupted, the signal is observed once it returns.
//!
//! The [`backoff`] module computes exponential retry delays for failed fetches and sends.

pub mod backoff;
pub mod shutdown;
