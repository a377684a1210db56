//! Control surface of a batchflow pipeline.

use std::sync::Arc;

use batchflow_config::shared::PipelineConfig;
use tracing::{debug, info};

use crate::bail;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::destination::Destination;
use crate::error::{ErrorKind, FlowResult};
use crate::reporter::{ErrorReporter, TracingErrorReporter};
use crate::source::Source;
use crate::state::{PipelineState, PipelineStatus, PipelineStatusHandle, StatusTracker};
use crate::types::PipelineId;
use crate::workers::flush::{FlushWorker, FlushWorkerHandle};

#[derive(Debug)]
enum WorkerState<S> {
    NotStarted { source: S },
    Started { flush_worker: FlushWorkerHandle },
    Finished,
}

/// Pipeline moving records from a [`Source`] to a [`Destination`] in bounded batches.
///
/// The pipeline is a state machine driven by [`Pipeline::start`] and [`Pipeline::stop`]. The
/// work happens on a background flush worker, the pipeline itself only holds the control
/// surface and never blocks on the worker except in [`Pipeline::wait`].
#[derive(Debug)]
pub struct Pipeline<S, D, R = TracingErrorReporter> {
    config: Arc<PipelineConfig>,
    destination: D,
    reporter: Arc<R>,
    tracker: StatusTracker,
    worker: WorkerState<S>,
    shutdown_tx: ShutdownTx,
}

impl<S, D> Pipeline<S, D, TracingErrorReporter>
where
    S: Source + Send + 'static,
    D: Destination + Clone + Send + Sync + 'static,
{
    /// Creates an idle pipeline reporting failures through `tracing`.
    pub fn new(config: PipelineConfig, source: S, destination: D) -> Self {
        Self::with_error_reporter(config, source, destination, TracingErrorReporter)
    }
}

impl<S, D, R> Pipeline<S, D, R>
where
    S: Source + Send + 'static,
    D: Destination + Clone + Send + Sync + 'static,
    R: ErrorReporter,
{
    /// Creates an idle pipeline reporting rejected batches and fatal errors to `reporter`.
    pub fn with_error_reporter(
        config: PipelineConfig,
        source: S,
        destination: D,
        reporter: R,
    ) -> Self {
        // Receivers are subscribed from the transmitter when the worker starts.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config: Arc::new(config),
            destination,
            reporter: Arc::new(reporter),
            tracker: StatusTracker::new(),
            worker: WorkerState::NotStarted { source },
            shutdown_tx,
        }
    }

    pub fn id(&self) -> PipelineId {
        self.config.id
    }

    /// Validates the configuration and spawns the flush worker.
    ///
    /// Fails with [`ErrorKind::InvalidState`] if the pipeline is not idle, leaving it untouched,
    /// and with [`ErrorKind::ConfigError`] if the configuration is invalid.
    pub async fn start(&mut self) -> FlowResult<()> {
        let state = self.tracker.state();
        if state != PipelineState::Idle {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline cannot be started",
                format!(
                    "The pipeline {} is {state}, only an idle pipeline can be started",
                    self.id()
                )
            );
        }

        self.config.validate()?;

        let source = match std::mem::replace(&mut self.worker, WorkerState::Finished) {
            WorkerState::NotStarted { source } => source,
            other => {
                self.worker = other;
                bail!(
                    ErrorKind::InvalidState,
                    "Pipeline cannot be started",
                    format!("The pipeline {} was already started", self.id())
                );
            }
        };

        info!(
            pipeline_id = self.id(),
            flush_threshold = self.config.batch.flush_threshold,
            buffer_capacity = self.config.batch.buffer_capacity,
            "starting pipeline"
        );

        // The receiver is subscribed before the state changes, so a stop issued right after start
        // is always observed by the worker.
        let shutdown_rx = self.shutdown_tx.subscribe();
        if let Err(state) = self.tracker.try_mark_running() {
            self.worker = WorkerState::NotStarted { source };
            bail!(
                ErrorKind::InvalidState,
                "Pipeline cannot be started",
                format!(
                    "The pipeline {} is {state}, only an idle pipeline can be started",
                    self.id()
                )
            );
        }

        let flush_worker = FlushWorker::new(
            self.id(),
            self.config.clone(),
            source,
            self.destination.clone(),
            self.reporter.clone(),
            self.tracker.clone(),
            shutdown_rx,
        )
        .spawn();

        self.worker = WorkerState::Started { flush_worker };

        Ok(())
    }

    /// Requests the pipeline to stop.
    ///
    /// Only a running pipeline is affected. The flush worker observes the request at its next
    /// suspension point, a send already in progress is allowed to complete. Use
    /// [`Pipeline::wait`] or [`PipelineStatusHandle::wait_until_stopped`] to wait for the end.
    pub fn stop(&self) {
        if !self.tracker.begin_stopping() {
            debug!(
                pipeline_id = self.id(),
                state = %self.tracker.state(),
                "pipeline is not running, ignoring stop request"
            );

            return;
        }

        info!(pipeline_id = self.id(), "trying to stop the pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            // No receiver means the worker already ended on its own.
            debug!("failed to send shutdown signal to the flush worker: {}", err);
            return;
        }

        info!("shutdown signal successfully sent to the flush worker");
    }

    /// Alias of [`Pipeline::stop`].
    pub fn shutdown(&self) {
        self.stop();
    }

    /// Returns a snapshot of the pipeline state and counters.
    pub fn status(&self) -> PipelineStatus {
        self.tracker.snapshot()
    }

    /// Returns a cloneable handle to observe the pipeline from other tasks.
    pub fn status_handle(&self) -> PipelineStatusHandle {
        self.tracker.handle()
    }

    /// Waits for the flush worker to complete.
    ///
    /// Returns the fatal error the pipeline stopped with, if any. A pipeline that was never
    /// started completes immediately.
    pub async fn wait(self) -> FlowResult<()> {
        let Pipeline {
            worker,
            shutdown_tx: _shutdown_tx,
            ..
        } = self;

        let WorkerState::Started { flush_worker } = worker else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for flush worker to complete");

        flush_worker.wait().await
    }

    /// Requests a stop and waits for the flush worker to complete.
    pub async fn shutdown_and_wait(self) -> FlowResult<()> {
        self.stop();
        self.wait().await
    }
}
