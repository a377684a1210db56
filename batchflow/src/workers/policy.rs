use crate::error::{ErrorKind, FlowError};

/// Retry behavior for a classified error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RetryDirective {
    /// The operation is retried automatically after a backoff delay.
    Timed,
    /// The batch being sent is dropped and reported, the loop continues.
    DropBatch,
    /// The source has no more data, the loop drains the buffer and stops cleanly.
    EndOfStream,
    /// The loop stops with an error.
    Fatal,
}

/// Policy describing how a [`FlowError`] should be handled by the flush worker.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorHandlingPolicy {
    retry_directive: RetryDirective,
    solution: Option<&'static str>,
}

impl ErrorHandlingPolicy {
    const fn new(retry_directive: RetryDirective, solution: Option<&'static str>) -> Self {
        Self {
            retry_directive,
            solution,
        }
    }

    /// Returns the retry directive for this policy.
    pub fn retry_directive(&self) -> RetryDirective {
        self.retry_directive
    }

    /// Returns an optional operator-facing solution message.
    pub fn solution(&self) -> Option<&'static str> {
        self.solution
    }
}

/// Builds an [`ErrorHandlingPolicy`] from a [`FlowError`] to determine in a unified way how errors
/// should be handled.
///
/// Aggregated errors are classified by their first error.
pub fn build_error_handling_policy(error: &FlowError) -> ErrorHandlingPolicy {
    match error.kind() {
        // Transient failures expected to recover on their own.
        ErrorKind::SourceError | ErrorKind::DestinationError => {
            ErrorHandlingPolicy::new(RetryDirective::Timed, None)
        }

        ErrorKind::DestinationRejected => ErrorHandlingPolicy::new(
            RetryDirective::DropBatch,
            Some("Inspect the reported batch, the destination refused its content."),
        ),

        ErrorKind::SourceExhausted => ErrorHandlingPolicy::new(RetryDirective::EndOfStream, None),

        ErrorKind::ConfigError => ErrorHandlingPolicy::new(
            RetryDirective::Fatal,
            Some("Fix the pipeline configuration and start a new pipeline."),
        ),

        _ => ErrorHandlingPolicy::new(
            RetryDirective::Fatal,
            Some(
                "There is no single prescribed solution for this error. Check the error detail and the source or destination it originated from before restarting the pipeline.",
            ),
        ),
    }
}
