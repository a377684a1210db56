use std::time::Duration;

use batchflow::destination::memory::MemoryDestination;
use batchflow::error::ErrorKind;
use batchflow::pipeline::Pipeline;
use batchflow::source::memory::MemorySource;
use batchflow::state::{PipelineState, StopReason};
use batchflow_config::shared::PipelineConfig;
use batchflow_telemetry::tracing::init_test_tracing;
use tokio::time::Instant;

use crate::support::destination::TestDestinationWrapper;
use crate::support::source::InfiniteSource;
use crate::support::{record_ids, records, test_config};

#[tokio::test(start_paused = true)]
async fn small_fetches_are_delivered_as_one_batch_at_end_of_stream() {
    init_test_tracing();

    let source = MemorySource::from_batches((0..5).map(|i| records(i * 2..i * 2 + 2)));
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());

    let mut pipeline = Pipeline::new(test_config(10, 100), source, destination.clone());
    let status_handle = pipeline.status_handle();

    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let attempts = destination.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].record_ids, (0..10).collect::<Vec<_>>());

    let status = status_handle.status();
    assert_eq!(status.state, PipelineState::Stopped);
    assert_eq!(status.stop_reason, Some(StopReason::SourceExhausted));
    assert!(status.stopped_cleanly());
    assert_eq!(status.delivered, 10);
    assert_eq!(status.buffered, 0);
    assert_eq!(status.discarded, 0);
}

#[tokio::test(start_paused = true)]
async fn batches_have_threshold_size_and_keep_fetch_order() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..4), records(4..9), records(9..11)]);
    let destination = MemoryDestination::new();

    let mut pipeline = Pipeline::new(test_config(3, 100), source, destination.clone());
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let batches = destination.batches().await;
    let batch_ids: Vec<Vec<u64>> = batches.iter().map(|batch| record_ids(batch)).collect();

    // A buffer holding exactly three records never flushes, only the end of stream does.
    assert_eq!(
        batch_ids,
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9, 10]]
    );
    assert!(destination.shutdown_called().await);
}

#[tokio::test(start_paused = true)]
async fn starting_twice_fails_and_keeps_running() {
    init_test_tracing();

    let source = MemorySource::new(vec![]).with_delay(Duration::from_secs(3600));
    let destination = MemoryDestination::new();

    let mut pipeline = Pipeline::new(test_config(10, 100), source, destination.clone());
    pipeline.start().await.unwrap();

    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(pipeline.status().state, PipelineState::Running);

    let started = Instant::now();
    pipeline.shutdown_and_wait().await.unwrap();

    // The pending fetch is dropped instead of being awaited.
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert!(destination.shutdown_called().await);
}

#[tokio::test(start_paused = true)]
async fn stop_prevents_any_further_send() {
    init_test_tracing();

    let source = InfiniteSource::new(2, Duration::from_millis(10));
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());

    let mut pipeline = Pipeline::new(test_config(3, 100), source.clone(), destination.clone());
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();

    destination
        .wait_for_delivered_records(9)
        .await
        .notified()
        .await;

    pipeline.stop();
    let status = status_handle.wait_until_stopped().await;
    let attempts_at_stop = destination.attempts().await.len();

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(destination.attempts().await.len(), attempts_at_stop);
    assert_eq!(status.state, PipelineState::Stopped);
    assert_eq!(status.stop_reason, Some(StopReason::Shutdown));
    assert_eq!(status.delivered, destination.delivered_records().await as u64);
    assert_eq!(
        status.delivered + status.discarded,
        source.produced_records()
    );
    assert_eq!(status.buffered, 0);

    pipeline.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_is_a_noop_unless_running() {
    init_test_tracing();

    let mut pipeline = Pipeline::new(
        test_config(2, 10),
        MemorySource::from_batches(vec![records(0..1)]),
        MemoryDestination::new(),
    );

    pipeline.stop();
    assert_eq!(pipeline.status().state, PipelineState::Idle);

    pipeline.start().await.unwrap();
    let status = pipeline.status_handle().wait_until_stopped().await;
    assert_eq!(status.stop_reason, Some(StopReason::SourceExhausted));

    pipeline.stop();
    assert_eq!(pipeline.status().stop_reason, Some(StopReason::SourceExhausted));

    pipeline.wait().await.unwrap();
}

#[tokio::test]
async fn waiting_on_a_pipeline_never_started_returns_immediately() {
    let pipeline = Pipeline::new(
        PipelineConfig::default(),
        MemorySource::new(vec![]),
        MemoryDestination::new(),
    );

    pipeline.wait().await.unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected_on_start() {
    let mut config = test_config(10, 100);
    config.retry.max_attempts = 0;

    let mut pipeline = Pipeline::new(config, MemorySource::new(vec![]), MemoryDestination::new());

    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
    assert_eq!(pipeline.status().state, PipelineState::Idle);
}

#[tokio::test(start_paused = true)]
async fn empty_fetches_keep_the_pipeline_idle_without_delivering() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![vec![], vec![], records(0..2), vec![]]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());

    let mut pipeline = Pipeline::new(test_config(5, 50), source.clone(), destination.clone());

    let started = Instant::now();
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    // Three empty fetches each wait the 10ms idle delay.
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(source.fetch_count().await, 5);

    let attempts = destination.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].record_ids, vec![0, 1]);
}
