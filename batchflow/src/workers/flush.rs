use std::sync::Arc;
use std::time::Duration;

use batchflow_config::shared::{OverflowPolicy, PipelineConfig};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crate::buffer::BatchBuffer;
use crate::concurrency::backoff::Backoff;
use crate::concurrency::shutdown::{ShutdownRx, is_shutdown_requested};
use crate::destination::Destination;
use crate::error::{ErrorKind, FlowError, FlowResult};
#[cfg(feature = "failpoints")]
use crate::failpoints::{AFTER_SOURCE_FETCH, BEFORE_DESTINATION_SEND, flow_fail_point};
use crate::flow_error;
use crate::reporter::ErrorReporter;
use crate::source::Source;
use crate::state::{PipelineState, StatusTracker, StopReason};
use crate::types::{PipelineId, Record};
use crate::workers::policy::{RetryDirective, build_error_handling_policy};

/// Handle for waiting on the flush worker.
#[derive(Debug)]
pub struct FlushWorkerHandle {
    handle: Option<JoinHandle<FlowResult<()>>>,
    tracker: StatusTracker,
}

impl FlushWorkerHandle {
    /// Waits for the flush worker to complete execution.
    ///
    /// Returns the fatal error the loop stopped with, if any. A panic or a cancellation of the
    /// worker task is converted into an error and recorded in the pipeline status.
    pub async fn wait(mut self) -> FlowResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let result = handle.await.map_err(|err| {
            if err.is_cancelled() {
                flow_error!(
                    ErrorKind::FlushWorkerCancelled,
                    "Flush worker was cancelled",
                    err
                )
            } else {
                flow_error!(ErrorKind::FlushWorkerPanic, "Flush worker panicked", err)
            }
        });

        match result {
            Ok(result) => result,
            Err(err) => {
                // The worker guard normally recorded the failure already, the first stop reason
                // is kept.
                self.tracker.set_buffered(0);
                self.tracker.set_held(0);
                self.tracker.mark_stopped(StopReason::Failed(err.clone()));

                Err(err)
            }
        }
    }
}

/// Guard that records a failed stop if the worker future is dropped before it finished.
///
/// Dropping while unwinding means the source or the destination panicked, any other drop means
/// the task was cancelled. The status then stops reporting
/// [`PipelineState::Running`] even if nobody joins the worker.
#[derive(Debug)]
struct StoppedGuard {
    tracker: StatusTracker,
}

impl Drop for StoppedGuard {
    fn drop(&mut self) {
        if self.tracker.state() == PipelineState::Stopped {
            return;
        }

        let err = if std::thread::panicking() {
            flow_error!(
                ErrorKind::FlushWorkerPanic,
                "Flush worker panicked",
                "The source or the destination panicked while the pipeline was running"
            )
        } else {
            flow_error!(
                ErrorKind::FlushWorkerCancelled,
                "Flush worker was cancelled",
                "The flush worker task was dropped before it completed"
            )
        };

        let status = self.tracker.snapshot();
        self.tracker
            .add_discarded(status.buffered.saturating_add(status.held));
        self.tracker.set_buffered(0);
        self.tracker.set_held(0);
        self.tracker.mark_stopped(StopReason::Failed(err));
    }
}

/// Worker driving the fetch, buffer and flush cycle of a pipeline.
///
/// The worker owns the source and the buffer. It is the only writer of the pipeline status and
/// always leaves it in [`PipelineState::Stopped`] when its task ends, even on a panic.
#[derive(Debug)]
pub struct FlushWorker<S, D, R> {
    pipeline_id: PipelineId,
    config: Arc<PipelineConfig>,
    source: S,
    destination: D,
    reporter: Arc<R>,
    tracker: StatusTracker,
    shutdown_rx: ShutdownRx,
}

impl<S, D, R> FlushWorker<S, D, R> {
    pub fn new(
        pipeline_id: PipelineId,
        config: Arc<PipelineConfig>,
        source: S,
        destination: D,
        reporter: Arc<R>,
        tracker: StatusTracker,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            pipeline_id,
            config,
            source,
            destination,
            reporter,
            tracker,
            shutdown_rx,
        }
    }
}

impl<S, D, R> FlushWorker<S, D, R>
where
    S: Source + Send + 'static,
    D: Destination + Send + Sync + 'static,
    R: ErrorReporter,
{
    /// Spawns the flush worker and returns a handle for waiting on it.
    pub fn spawn(self) -> FlushWorkerHandle {
        info!(destination = D::name(), "starting flush worker");

        let tracker = self.tracker.clone();
        let flush_worker_span =
            tracing::info_span!("flush_worker", pipeline_id = self.pipeline_id);

        let flush_worker = async move {
            let FlushWorker {
                pipeline_id: _,
                config,
                source,
                destination,
                reporter,
                tracker,
                shutdown_rx,
            } = self;

            let _stopped_guard = StoppedGuard {
                tracker: tracker.clone(),
            };

            let mut flush_loop = FlushLoop {
                buffer: BatchBuffer::new(
                    config.batch.flush_threshold,
                    config.batch.buffer_capacity,
                ),
                fetch_backoff: Backoff::new(config.retry.clone()),
                send_backoff: Backoff::new(config.retry.clone()),
                config,
                source,
                destination,
                reporter,
                tracker,
                shutdown_rx,
            };

            let result = flush_loop.run().await;
            flush_loop.finish(result).await
        }
        .instrument(flush_worker_span.or_current());

        let handle = tokio::spawn(flush_worker);

        FlushWorkerHandle {
            handle: Some(handle),
            tracker,
        }
    }
}

struct FlushLoop<S, D, R> {
    config: Arc<PipelineConfig>,
    source: S,
    destination: D,
    reporter: Arc<R>,
    tracker: StatusTracker,
    shutdown_rx: ShutdownRx,
    buffer: BatchBuffer,
    fetch_backoff: Backoff,
    send_backoff: Backoff,
}

impl<S, D, R> FlushLoop<S, D, R>
where
    S: Source + Send + 'static,
    D: Destination + Send + Sync + 'static,
    R: ErrorReporter,
{
    async fn run(&mut self) -> FlowResult<StopReason> {
        loop {
            if is_shutdown_requested(&self.shutdown_rx) {
                return Ok(StopReason::Shutdown);
            }

            // The fetch is dropped if a shutdown arrives first, sources are required to be cancel
            // safe for this reason.
            let fetched = tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    info!("shutdown requested while fetching");
                    return Ok(StopReason::Shutdown);
                }
                result = fetch_records(&mut self.source) => result,
            };

            let records = match fetched {
                Ok(records) => {
                    self.fetch_backoff.reset();
                    records
                }
                Err(err) => match build_error_handling_policy(&err).retry_directive() {
                    RetryDirective::Timed => {
                        let delay = self.fetch_backoff.record_failure();
                        warn!(
                            attempt = self.fetch_backoff.failures(),
                            delay_ms = saturating_millis(delay),
                            error = %err,
                            "source fetch failed, retrying after backoff"
                        );

                        if !self.sleep_or_shutdown(delay).await {
                            return Ok(StopReason::Shutdown);
                        }

                        continue;
                    }
                    RetryDirective::EndOfStream => {
                        info!("source exhausted, draining the buffer");

                        return self.drain().await;
                    }
                    RetryDirective::DropBatch | RetryDirective::Fatal => {
                        error!(error = %err, "source fetch failed with a fatal error");

                        return Err(err);
                    }
                },
            };

            if records.is_empty() {
                if !self.sleep_or_shutdown(self.config.batch.idle_delay()).await {
                    return Ok(StopReason::Shutdown);
                }

                continue;
            }

            debug!(fetched = records.len(), "fetched records from source");

            if let Some(reason) = self.admit(records).await? {
                return Ok(reason);
            }
        }
    }

    /// Appends `records` to the buffer and flushes every batch that becomes ready.
    ///
    /// Records that do not fit are either held until they are admitted or dropped, according
    /// to the overflow policy. No fetch happens until this returns.
    async fn admit(&mut self, records: Vec<Record>) -> FlowResult<Option<StopReason>> {
        let mut pending = records;

        loop {
            let remainder = self.buffer.append(pending);
            self.sync_buffered();
            self.tracker
                .set_held(remainder.as_ref().map_or(0, Vec::len));

            let flushed = self.flush_ready_batches().await;
            let stop_reason = match flushed {
                Ok(stop_reason) => stop_reason,
                Err(err) => {
                    self.discard(remainder);
                    return Err(err);
                }
            };

            if stop_reason.is_some() {
                self.discard(remainder);
                return Ok(stop_reason);
            }

            let Some(remainder) = remainder else {
                return Ok(None);
            };

            match self.config.batch.overflow_policy {
                OverflowPolicy::Backpressure => {
                    debug!(
                        pending = remainder.len(),
                        "buffer is full, holding records until there is room"
                    );
                    pending = remainder;
                }
                OverflowPolicy::Reject => {
                    warn!(
                        overflowed = remainder.len(),
                        capacity = self.buffer.capacity(),
                        "buffer is full, dropping records"
                    );
                    self.tracker.add_overflowed(remainder.len());
                    self.tracker.set_held(0);

                    return Ok(None);
                }
            }
        }
    }

    /// Sends batches while the buffer holds more records than the flush threshold.
    async fn flush_ready_batches(&mut self) -> FlowResult<Option<StopReason>> {
        while let Some(batch) = self.buffer.try_extract_batch() {
            self.sync_buffered();

            if let Some(reason) = self.send_batch(batch).await? {
                return Ok(Some(reason));
            }
        }

        Ok(None)
    }

    /// Sends whatever is left in the buffer as one last batch and stops.
    async fn drain(&mut self) -> FlowResult<StopReason> {
        let batch = self.buffer.drain_all();
        self.sync_buffered();

        if !batch.is_empty()
            && let Some(reason) = self.send_batch(batch).await?
        {
            return Ok(reason);
        }

        Ok(StopReason::SourceExhausted)
    }

    /// Sends `batch`, retrying transient failures up to the configured number of attempts.
    ///
    /// While waiting for a retry the batch sits at the front of the buffer, ahead of newer
    /// records. Returns `Some` when a shutdown interrupted the delivery, in which case the batch is
    /// left in the buffer.
    async fn send_batch(&mut self, mut batch: Vec<Record>) -> FlowResult<Option<StopReason>> {
        let batch_size = batch.len();
        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = 0;

        loop {
            if is_shutdown_requested(&self.shutdown_rx) {
                self.requeue(batch);
                return Ok(Some(StopReason::Shutdown));
            }

            attempt += 1;
            let result = send_records(&self.destination, &batch).await;

            let err = match result {
                Ok(()) => {
                    self.send_backoff.reset();
                    self.tracker.add_delivered(batch_size);
                    debug!(batch_size, attempt, "batch delivered");

                    return Ok(None);
                }
                Err(err) => err,
            };

            match build_error_handling_policy(&err).retry_directive() {
                RetryDirective::Timed if attempt < max_attempts => {
                    let delay = self.send_backoff.record_failure();
                    warn!(
                        batch_size,
                        attempt,
                        max_attempts,
                        delay_ms = saturating_millis(delay),
                        error = %err,
                        "batch delivery failed, retrying after backoff"
                    );

                    self.requeue(batch);
                    if !self.sleep_or_shutdown(delay).await {
                        return Ok(Some(StopReason::Shutdown));
                    }

                    batch = self.buffer.take_front(batch_size);
                    self.sync_buffered();
                }
                RetryDirective::Timed => {
                    error!(
                        batch_size,
                        attempt,
                        error = %err,
                        "batch delivery retries exhausted, stopping the pipeline"
                    );

                    self.send_backoff.reset();
                    self.tracker.add_failed_batch(batch_size);
                    self.reporter.report_rejected_batch(&err, &batch);

                    return Err(flow_error!(
                        ErrorKind::PipelineFatal,
                        "Batch delivery retries exhausted",
                        format!("The batch of {batch_size} records failed {attempt} times"),
                        source: err
                    ));
                }
                RetryDirective::DropBatch => {
                    warn!(batch_size, error = %err, "batch rejected by the destination, dropping it");

                    self.send_backoff.reset();
                    self.tracker.add_failed_batch(batch_size);
                    self.reporter.report_rejected_batch(&err, &batch);

                    return Ok(None);
                }
                RetryDirective::EndOfStream | RetryDirective::Fatal => {
                    error!(batch_size, error = %err, "batch delivery failed with a fatal error");

                    self.tracker.add_failed_batch(batch_size);

                    return Err(err);
                }
            }
        }
    }

    /// Waits for `delay`, returning `false` if a shutdown arrived first.
    async fn sleep_or_shutdown(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;

            _ = self.shutdown_rx.changed() => {
                info!("shutdown requested while waiting");
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Records the end of the loop in the pipeline status and shuts the destination down.
    async fn finish(mut self, result: FlowResult<StopReason>) -> FlowResult<()> {
        let leftover = self.buffer.drain_all();
        self.discard(Some(leftover));
        self.sync_buffered();

        let shutdown_result = self.destination.shutdown().await;

        let result = match (result, shutdown_result) {
            (Ok(reason), Ok(())) => Ok(reason),
            (Ok(_), Err(err)) => {
                error!(error = %err, "destination shutdown failed");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(shutdown_err)) => {
                error!(error = %shutdown_err, "destination shutdown failed");
                Err(FlowError::from(vec![err, shutdown_err]))
            }
        };

        let status = self.tracker.snapshot();
        match result {
            Ok(reason) => {
                info!(
                    ?reason,
                    delivered = status.delivered,
                    failed_records = status.failed_records,
                    discarded = status.discarded,
                    "flush worker completed"
                );
                self.tracker.mark_stopped(reason);

                Ok(())
            }
            Err(err) => {
                self.reporter.report_fatal(&err);
                self.tracker.mark_stopped(StopReason::Failed(err.clone()));

                Err(err)
            }
        }
    }

    fn requeue(&mut self, batch: Vec<Record>) {
        self.buffer.requeue_front(batch);
        self.sync_buffered();
    }

    fn discard(&self, records: Option<Vec<Record>>) {
        self.tracker.set_held(0);

        if let Some(records) = records
            && !records.is_empty()
        {
            warn!(discarded = records.len(), "discarding undelivered records");
            self.tracker.add_discarded(records.len());
        }
    }

    fn sync_buffered(&self) {
        self.tracker.set_buffered(self.buffer.len());
    }
}

async fn fetch_records<S: Source>(source: &mut S) -> FlowResult<Vec<Record>> {
    let records = source.fetch().await?;

    #[cfg(feature = "failpoints")]
    flow_fail_point(AFTER_SOURCE_FETCH)?;

    Ok(records)
}

async fn send_records<D: Destination>(destination: &D, batch: &[Record]) -> FlowResult<()> {
    #[cfg(feature = "failpoints")]
    flow_fail_point(BEFORE_DESTINATION_SEND)?;

    destination.send(batch).await
}

/// Converts `delay` to whole milliseconds for logging, saturating at [`u64::MAX`].
fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
