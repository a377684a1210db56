use std::future::Future;

use crate::error::FlowResult;
use crate::types::Record;

/// Trait for systems the pipeline pulls records from.
///
/// [`Source`] implementations are the integration boundary of a pipeline: REST polling, database
/// cursors, file tailers and so on. The pipeline calls [`Source::fetch`] in a loop from a single
/// task and never calls it concurrently.
///
/// Errors are classified through their [`crate::error::ErrorKind`]:
/// - [`crate::error::ErrorKind::SourceError`] is transient, the fetch is retried after a backoff.
/// - [`crate::error::ErrorKind::SourceExhausted`] signals a clean end of input, the pipeline
///   flushes what it has buffered and stops.
/// - Any other kind stops the pipeline with a fatal error.
pub trait Source {
    /// Fetches the next records.
    ///
    /// The call may suspend for as long as it needs, but should suspend rather than return
    /// immediately when no data is ready. An empty vector is a valid result.
    ///
    /// The future must be cancel safe: when a stop is requested the pipeline drops an in-flight
    /// fetch, and records already read by an abandoned fetch must not be lost silently.
    fn fetch(&mut self) -> impl Future<Output = FlowResult<Vec<Record>>> + Send;
}
