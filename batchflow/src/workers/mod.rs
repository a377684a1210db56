//! Worker implementations for pipeline operations.

pub mod flush;
pub mod policy;
