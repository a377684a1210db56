#[path = "../support/mod.rs"]
mod support;

mod backpressure_test;
mod failure_test;
mod pipeline_test;
