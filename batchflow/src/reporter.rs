//! Collaborator notified about batches and errors the pipeline gives up on.

use tracing::error;

use crate::error::FlowError;
use crate::types::Record;

/// Receives the failures that the flush worker cannot recover from.
///
/// Implementations are called from the worker task and should return quickly. Reporting is
/// infallible from the worker's point of view, a reporter that needs I/O should hand the work off
/// to its own task.
pub trait ErrorReporter: Send + Sync + 'static {
    /// Called when a batch is dropped, either rejected by the destination or dropped after its
    /// retry budget was exhausted.
    fn report_rejected_batch(&self, error: &FlowError, batch: &[Record]);

    /// Called once when the pipeline stops because of a fatal error.
    fn report_fatal(&self, error: &FlowError);
}

/// Default [`ErrorReporter`] writing every report to the `tracing` error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report_rejected_batch(&self, error: &FlowError, batch: &[Record]) {
        let first_record_id = batch.first().map(|record| record.id().into_inner());
        let last_record_id = batch.last().map(|record| record.id().into_inner());

        error!(
            batch_size = batch.len(),
            ?first_record_id,
            ?last_record_id,
            error = %error,
            "batch dropped"
        );
    }

    fn report_fatal(&self, error: &FlowError) {
        error!(error = %error, "pipeline failed");
    }
}
