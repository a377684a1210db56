use batchflow::destination::memory::MemoryDestination;
use batchflow::pipeline::Pipeline;
use batchflow::source::memory::MemorySource;
use batchflow_config::shared::OverflowPolicy;
use batchflow_telemetry::tracing::init_test_tracing;

use crate::support::destination::TestDestinationWrapper;
use crate::support::{records, test_config};

#[tokio::test(start_paused = true)]
async fn oversized_fetch_is_admitted_in_chunks_without_loss() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..12)]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());

    let mut pipeline = Pipeline::new(test_config(3, 5), source, destination.clone());
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let attempted_ids: Vec<Vec<u64>> = destination
        .attempts()
        .await
        .into_iter()
        .map(|attempt| attempt.record_ids)
        .collect();
    assert_eq!(
        attempted_ids,
        vec![
            vec![0, 1, 2],
            vec![3, 4, 5],
            vec![6, 7, 8],
            vec![9, 10, 11]
        ]
    );

    let status = status_handle.status();
    assert!(status.stopped_cleanly());
    assert_eq!(status.delivered, 12);
    assert_eq!(status.overflowed, 0);
}

#[tokio::test(start_paused = true)]
async fn reject_policy_drops_and_counts_overflow() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..12), records(12..14)]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());

    let mut config = test_config(3, 5);
    config.batch.overflow_policy = OverflowPolicy::Reject;

    let mut pipeline = Pipeline::new(config, source, destination.clone());
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let attempted_ids: Vec<Vec<u64>> = destination
        .attempts()
        .await
        .into_iter()
        .map(|attempt| attempt.record_ids)
        .collect();
    assert_eq!(attempted_ids, vec![vec![0, 1, 2], vec![3, 4, 12], vec![13]]);

    let status = status_handle.status();
    assert!(status.stopped_cleanly());
    assert_eq!(status.delivered, 7);
    assert_eq!(status.overflowed, 7);
}
