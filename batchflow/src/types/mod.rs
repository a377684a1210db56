//! Common types used throughout batchflow.

mod pipeline;
mod record;

pub use pipeline::*;
pub use record::*;
