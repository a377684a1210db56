//! Error types and result definitions for batchflow pipelines.
//!
//! [`FlowError`] carries an [`ErrorKind`] used by the retry policy to decide how a failure is
//! handled, a static description, optional dynamic detail, an optional source error and the
//! location where it was raised. Several errors can be aggregated into one, which is how the
//! controller reports a fatal loop error together with a failing destination shutdown.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use batchflow_config::shared::ValidationError;

/// Convenient result type for batchflow operations using [`FlowError`] as the error type.
pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for batchflow operations.
///
/// The type is cheap to clone, so the same error can be stored in the pipeline status and
/// returned to the caller waiting on the pipeline.
#[derive(Debug, Clone)]
pub struct FlowError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    Many {
        errors: Vec<FlowError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur while running a pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source errors
    /// Transient failure while fetching, the fetch is retried after a backoff.
    SourceError,
    /// The source has no more records, the pipeline drains and stops cleanly.
    SourceExhausted,

    // Destination errors
    /// Transient failure while sending, the batch is requeued and retried.
    DestinationError,
    /// The destination refused the batch for good, the batch is dropped and reported.
    DestinationRejected,

    // Lifecycle errors
    /// A control operation was called in a state that does not allow it.
    InvalidState,
    /// The retry budget of a batch is exhausted, the pipeline stops.
    PipelineFatal,
    FlushWorkerPanic,
    FlushWorkerCancelled,

    // Configuration errors
    ConfigError,

    // IO & serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    Unknown,
}

impl FlowError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`] if
    /// the aggregate is empty.
    pub fn kind(&self) -> ErrorKind {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.kind,
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match &self.repr {
            ErrorRepr::Single(payload) => vec![payload.kind],
            ErrorRepr::Many { errors, .. } => errors.iter().flat_map(|err| err.kinds()).collect(),
        }
    }

    /// Returns the static description of the error, or of the first aggregated error.
    pub fn description(&self) -> Option<&str> {
        match &self.repr {
            ErrorRepr::Single(payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { errors, .. } => errors.first().and_then(|err| err.description()),
        }
    }

    /// Returns the dynamic detail, or the first one found among aggregated errors.
    pub fn detail(&self) -> Option<&str> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.detail.as_deref(),
            ErrorRepr::Many { errors, .. } => errors.iter().find_map(|err| err.detail()),
        }
    }

    /// Returns the captured backtrace for single errors.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &self.repr {
            ErrorRepr::Single(payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the callsite where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating error, exposed through [`error::Error::source`].
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(payload) = &mut self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        FlowError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source: None,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for FlowError {
    /// Errors compare equal when their kinds match, ignoring detail and location.
    fn eq(&self, other: &FlowError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                write!(
                    f,
                    "[{:?}] {} @ {}:{}",
                    payload.kind,
                    payload.description,
                    payload.location.file(),
                    payload.location.line(),
                )?;

                if let Some(detail) = &payload.detail {
                    write_indented(f, "Detail", detail)?;
                }

                if let Some(source) = &payload.source {
                    write_indented(f, "Caused by", &source.to_string())?;
                }

                if payload.backtrace.status() == BacktraceStatus::Captured {
                    write_indented(f, "Backtrace", &payload.backtrace.to_string())?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                write!(
                    f,
                    "[Many] {} errors aggregated @ {}:{}",
                    errors.len(),
                    location.file(),
                    location.line(),
                )?;

                for (index, error) in errors.iter().enumerate() {
                    write_indented(f, &format!("{}.", index + 1), &error.to_string())?;
                }

                Ok(())
            }
        }
    }
}

impl error::Error for FlowError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, label: &str, block: &str) -> fmt::Result {
    write!(f, "\n  {label}")?;
    for line in block.lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

impl From<(ErrorKind, &'static str)> for FlowError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> FlowError {
        FlowError::from_components(kind, Cow::Borrowed(desc), None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for FlowError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> FlowError {
        FlowError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()))
    }
}

/// Aggregates several errors, returning the only error as is when there is exactly one.
impl<E> From<Vec<E>> for FlowError
where
    E: Into<FlowError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> FlowError {
        let location = Location::caller();
        let mut errors: Vec<FlowError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        FlowError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<std::io::Error> for FlowError {
    #[track_caller]
    fn from(err: std::io::Error) -> FlowError {
        let detail = err.to_string();
        FlowError::from((ErrorKind::IoError, "An I/O error occurred", detail)).with_source(err)
    }
}

impl From<serde_json::Error> for FlowError {
    #[track_caller]
    fn from(err: serde_json::Error) -> FlowError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };
        let detail = err.to_string();

        FlowError::from((kind, description, detail)).with_source(err)
    }
}

impl From<ValidationError> for FlowError {
    #[track_caller]
    fn from(err: ValidationError) -> FlowError {
        let detail = err.to_string();
        FlowError::from((ErrorKind::ConfigError, "Invalid pipeline configuration", detail))
            .with_source(err)
    }
}
