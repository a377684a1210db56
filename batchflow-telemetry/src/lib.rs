//! Tracing initialization shared by batchflow binaries and tests.

pub mod tracing;
