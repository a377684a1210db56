use std::time::Duration;

use batchflow::destination::memory::MemoryDestination;
use batchflow::error::ErrorKind;
use batchflow::pipeline::Pipeline;
use batchflow::source::memory::MemorySource;
use batchflow::state::PipelineState;
use batchflow_telemetry::tracing::init_test_tracing;

use crate::support::destination::TestDestinationWrapper;
use crate::support::reporter::RecordingErrorReporter;
use crate::support::source::PanickingSource;
use crate::support::{records, test_config};

#[tokio::test(start_paused = true)]
async fn failing_destination_shutdown_fails_a_clean_run() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..4)]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    destination.fail_shutdown(ErrorKind::DestinationError).await;
    let reporter = RecordingErrorReporter::new();

    let mut pipeline = Pipeline::with_error_reporter(
        test_config(3, 100),
        source,
        destination.clone(),
        reporter.clone(),
    );
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kinds(), vec![ErrorKind::DestinationError]);

    // Every record was delivered before the destination failed to shut down.
    assert_eq!(destination.delivered_records().await, 4);

    let status = status_handle.status();
    assert_eq!(status.state, PipelineState::Stopped);
    assert!(!status.stopped_cleanly());
    assert_eq!(status.delivered, 4);
    assert_eq!(
        status.error().map(|err| err.kind()),
        Some(ErrorKind::DestinationError)
    );
    assert_eq!(
        reporter.fatal_errors(),
        vec![vec![ErrorKind::DestinationError]]
    );
}

#[tokio::test(start_paused = true)]
async fn failing_destination_shutdown_is_aggregated_with_the_loop_error() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..3)]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    destination
        .fail_next_sends(ErrorKind::DestinationError, 5)
        .await;
    destination.fail_shutdown(ErrorKind::DestinationError).await;
    let reporter = RecordingErrorReporter::new();

    let mut pipeline = Pipeline::with_error_reporter(
        test_config(2, 100),
        source,
        destination.clone(),
        reporter.clone(),
    );
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PipelineFatal);
    assert_eq!(
        err.kinds(),
        vec![ErrorKind::PipelineFatal, ErrorKind::DestinationError]
    );

    let status = status_handle.status();
    assert_eq!(status.state, PipelineState::Stopped);
    assert_eq!(status.failed_batches, 1);
    assert_eq!(
        status.error().map(|err| err.kinds()),
        Some(vec![ErrorKind::PipelineFatal, ErrorKind::DestinationError])
    );
    assert_eq!(
        reporter.fatal_errors(),
        vec![vec![ErrorKind::PipelineFatal, ErrorKind::DestinationError]]
    );
}

#[tokio::test(start_paused = true)]
async fn source_panic_stops_the_pipeline_without_waiting_on_it() {
    init_test_tracing();

    let mut pipeline = Pipeline::new(test_config(3, 10), PanickingSource, MemoryDestination::new());
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), status_handle.wait_until_stopped())
        .await
        .expect("status never reached stopped after the worker panicked");
    assert_eq!(status.state, PipelineState::Stopped);
    assert!(!status.is_running());
    assert!(!status.stopped_cleanly());
    assert_eq!(
        status.error().map(|err| err.kind()),
        Some(ErrorKind::FlushWorkerPanic)
    );

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FlushWorkerPanic);
    assert_eq!(
        status_handle.status().error().map(|err| err.kind()),
        Some(ErrorKind::FlushWorkerPanic)
    );
}

#[tokio::test(start_paused = true)]
async fn records_waiting_for_room_are_reported_as_held() {
    init_test_tracing();

    let source = MemorySource::from_batches(vec![records(0..12)]);
    let destination = TestDestinationWrapper::wrap(MemoryDestination::new());
    destination
        .fail_next_sends(ErrorKind::DestinationError, 1)
        .await;
    let first_attempt = destination.wait_for_attempts(1).await;

    let mut pipeline = Pipeline::new(test_config(3, 5), source, destination.clone());
    let status_handle = pipeline.status_handle();
    pipeline.start().await.unwrap();

    // The first batch backs off for 100ms at the front of the full buffer while the seven
    // records that did not fit wait outside of it.
    first_attempt.notified().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let status = status_handle.status();
    assert_eq!(status.buffered, 5);
    assert_eq!(status.held, 7);

    pipeline.wait().await.unwrap();

    let status = status_handle.status();
    assert!(status.stopped_cleanly());
    assert_eq!(status.delivered, 12);
    assert_eq!(status.buffered, 0);
    assert_eq!(status.held, 0);
}
