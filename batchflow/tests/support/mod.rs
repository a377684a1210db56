#![allow(dead_code)]

use std::ops::Range;

use batchflow::types::{Record, RecordId};
use batchflow_config::shared::{BatchConfig, OverflowPolicy, PipelineConfig, RetryConfig};

pub mod destination;
pub mod notify;
pub mod reporter;

pub fn records(ids: Range<u64>) -> Vec<Record> {
    ids.map(|id| Record::new(RecordId(id), format!("record-{id}")))
        .collect()
}

pub fn record_ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|record| record.id().into_inner()).collect()
}

/// Returns a configuration with short, jitter-free delays so paused-clock tests stay
/// deterministic.
pub fn test_config(flush_threshold: usize, buffer_capacity: usize) -> PipelineConfig {
    PipelineConfig {
        id: 1,
        batch: BatchConfig {
            flush_threshold,
            buffer_capacity,
            overflow_policy: OverflowPolicy::Backpressure,
            idle_delay_ms: 10,
        },
        retry: RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            jitter_ratio: 0.0,
            max_attempts: 5,
        },
    }
}
