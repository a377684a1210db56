use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::error::FlowError;

/// Lifecycle state of a pipeline.
///
/// ```text
/// Idle -> Running -> Stopping -> Stopped
///            |                     ^
///            +---------------------+
/// ```
///
/// The direct `Running -> Stopped` transition happens when the loop ends by itself, because the
/// source was exhausted or a fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Stopping => "stopping",
            PipelineState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pipeline reached [`PipelineState::Stopped`].
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// A stop was requested through the control surface.
    Shutdown,
    /// The source reported that it has no more records and the buffer was drained.
    SourceExhausted,
    /// The loop stopped because of a fatal error.
    Failed(FlowError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Failed(_))
    }
}

/// Point-in-time view of a pipeline.
///
/// Counters are read one by one, so a snapshot taken while the loop runs may mix values from two
/// consecutive iterations. Once the state is [`PipelineState::Stopped`] every counter is final.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub stop_reason: Option<StopReason>,
    /// Records currently held by the buffer.
    pub buffered: usize,
    /// Fetched records waiting for room in a full buffer under the backpressure overflow policy.
    ///
    /// They are not part of `buffered`, which never exceeds the buffer capacity.
    pub held: usize,
    /// Records confirmed by the destination.
    pub delivered: u64,
    /// Records belonging to dropped batches.
    pub failed_records: u64,
    /// Batches dropped after a rejection or an exhausted retry budget.
    pub failed_batches: u64,
    /// Records refused by a full buffer under the reject overflow policy.
    pub overflowed: u64,
    /// Records still buffered or held when the loop stopped.
    pub discarded: u64,
}

impl PipelineStatus {
    /// Returns `true` while the loop is running, including while it is stopping.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            PipelineState::Running | PipelineState::Stopping
        )
    }

    /// Returns `true` if the pipeline stopped without a fatal error.
    pub fn stopped_cleanly(&self) -> bool {
        self.state == PipelineState::Stopped
            && self
                .stop_reason
                .as_ref()
                .is_some_and(|reason| !reason.is_failure())
    }

    /// Returns the fatal error the pipeline stopped with, if any.
    pub fn error(&self) -> Option<&FlowError> {
        match &self.stop_reason {
            Some(StopReason::Failed(err)) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Lifecycle {
    state: PipelineState,
    stop_reason: Option<StopReason>,
}

#[derive(Debug, Default)]
struct Counters {
    buffered: AtomicUsize,
    held: AtomicUsize,
    delivered: AtomicU64,
    failed_records: AtomicU64,
    failed_batches: AtomicU64,
    overflowed: AtomicU64,
    discarded: AtomicU64,
}

/// Shared lifecycle state and counters of a pipeline.
///
/// The lifecycle lives in a watch channel so that observers can wait for transitions, while the
/// counters are plain atomics written by the flush worker only. Every accessor is non-blocking.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    lifecycle: Arc<watch::Sender<Lifecycle>>,
    counters: Arc<Counters>,
}

impl StatusTracker {
    pub fn new() -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle {
            state: PipelineState::Idle,
            stop_reason: None,
        });

        Self {
            lifecycle: Arc::new(lifecycle),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.lifecycle.borrow().state
    }

    /// Moves the pipeline from `Idle` to `Running`.
    ///
    /// On failure nothing is modified and the current state is returned.
    pub fn try_mark_running(&self) -> Result<(), PipelineState> {
        let mut current = PipelineState::Idle;
        let modified = self.lifecycle.send_if_modified(|lifecycle| {
            current = lifecycle.state;
            if lifecycle.state != PipelineState::Idle {
                return false;
            }

            lifecycle.state = PipelineState::Running;
            true
        });

        if modified { Ok(()) } else { Err(current) }
    }

    /// Moves the pipeline from `Running` to `Stopping`, returning whether the transition happened.
    pub fn begin_stopping(&self) -> bool {
        self.lifecycle.send_if_modified(|lifecycle| {
            if lifecycle.state != PipelineState::Running {
                return false;
            }

            lifecycle.state = PipelineState::Stopping;
            true
        })
    }

    /// Moves the pipeline to `Stopped` with `reason`.
    ///
    /// The first recorded reason wins, later calls are ignored.
    pub fn mark_stopped(&self, reason: StopReason) {
        self.lifecycle.send_if_modified(|lifecycle| {
            if lifecycle.state == PipelineState::Stopped {
                return false;
            }

            lifecycle.state = PipelineState::Stopped;
            lifecycle.stop_reason = Some(reason);
            true
        });
    }

    pub fn set_buffered(&self, buffered: usize) {
        self.counters.buffered.store(buffered, Ordering::SeqCst);
    }

    pub fn set_held(&self, held: usize) {
        self.counters.held.store(held, Ordering::SeqCst);
    }

    pub fn add_delivered(&self, records: usize) {
        self.counters
            .delivered
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    /// Counts one dropped batch made of `records` records.
    pub fn add_failed_batch(&self, records: usize) {
        self.counters.failed_batches.fetch_add(1, Ordering::SeqCst);
        self.counters
            .failed_records
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    pub fn add_overflowed(&self, records: usize) {
        self.counters
            .overflowed
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    pub fn add_discarded(&self, records: usize) {
        self.counters
            .discarded
            .fetch_add(records as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PipelineStatus {
        let lifecycle = self.lifecycle.borrow().clone();

        PipelineStatus {
            state: lifecycle.state,
            stop_reason: lifecycle.stop_reason,
            buffered: self.counters.buffered.load(Ordering::SeqCst),
            held: self.counters.held.load(Ordering::SeqCst),
            delivered: self.counters.delivered.load(Ordering::SeqCst),
            failed_records: self.counters.failed_records.load(Ordering::SeqCst),
            failed_batches: self.counters.failed_batches.load(Ordering::SeqCst),
            overflowed: self.counters.overflowed.load(Ordering::SeqCst),
            discarded: self.counters.discarded.load(Ordering::SeqCst),
        }
    }

    pub fn handle(&self) -> PipelineStatusHandle {
        PipelineStatusHandle {
            tracker: self.clone(),
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a pipeline's status, usable from any task.
#[derive(Debug, Clone)]
pub struct PipelineStatusHandle {
    tracker: StatusTracker,
}

impl PipelineStatusHandle {
    pub fn status(&self) -> PipelineStatus {
        self.tracker.snapshot()
    }

    /// Waits until the pipeline reaches [`PipelineState::Stopped`] and returns the final status.
    ///
    /// Never completes for a pipeline that is never started.
    pub async fn wait_until_stopped(&self) -> PipelineStatus {
        let mut lifecycle_rx = self.tracker.lifecycle.subscribe();

        // The sender is owned by the tracker held in `self`, so the channel cannot close while
        // waiting.
        let _ = lifecycle_rx
            .wait_for(|lifecycle| lifecycle.state == PipelineState::Stopped)
            .await;

        self.tracker.snapshot()
    }
}
