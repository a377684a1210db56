use std::future::Future;

use crate::error::FlowResult;
use crate::types::Record;

/// Trait for systems that receive flushed batches from a pipeline.
///
/// Delivery is at least once: a send that partially succeeded on the destination side but
/// returned an error is treated as fully failed and the same batch is sent again. Destinations
/// must tolerate duplicates or deduplicate on [`Record::id`].
///
/// Errors are classified through their [`crate::error::ErrorKind`]:
/// - [`crate::error::ErrorKind::DestinationError`] is transient, the batch is retried.
/// - [`crate::error::ErrorKind::DestinationRejected`] means the batch is permanently invalid, it
///   is dropped and reported without retrying.
/// - Any other kind stops the pipeline with a fatal error.
///
/// The trait also provides an optional [`Destination::shutdown`] method with a default no-op
/// implementation. Override it if the destination needs cleanup once the pipeline stops.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Propagates the end of the pipeline to the destination.
    ///
    /// Called once by the flush worker after its last send, whatever the stop reason.
    fn shutdown(&self) -> impl Future<Output = FlowResult<()>> + Send {
        async { Ok(()) }
    }

    /// Sends a batch of records.
    ///
    /// The batch is never empty and its records are in fetch order. Batches are sent one at a
    /// time, a new send only starts after the previous one returned.
    fn send(&self, batch: &[Record]) -> impl Future<Output = FlowResult<()>> + Send;
}
