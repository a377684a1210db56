use std::io;
use std::sync::Once;

use batchflow_config::Environment;
use batchflow_config::environment::UnknownEnvironment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that enables log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

const DEFAULT_LOG_LEVEL: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to determine the runtime environment: {0}")]
    Environment(#[from] UnknownEnvironment),

    #[error("failed to bridge `log` records into tracing: {0}")]
    LogTracer(#[from] tracing_log::log::SetLoggerError),

    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Guard that flushes buffered log lines when dropped.
///
/// Keep it alive for the whole lifetime of the process, dropping it early silently discards
/// every log line written afterwards.
#[must_use = "dropping the flusher stops log output"]
#[derive(Debug)]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global tracing subscriber for a binary named `app_name`.
///
/// In `prod` lines are written as JSON objects including the current span, in `dev` they use the
/// human readable formatter. `RUST_LOG` overrides the default filter, which logs `app_name` and
/// `batchflow` at info level.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load()?;

    LogTracer::init()?;

    let (writer, guard) = tracing_appender::non_blocking(io::stdout());
    let registry = tracing_subscriber::registry().with(env_filter(app_name));

    if environment.is_prod() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer),
            )
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_writer(writer)).try_init()?;
    }

    ::tracing::info!(app_name, %environment, "tracing initialized");

    Ok(LogFlusher { _guard: guard })
}

/// Installs a test subscriber once per process, only when `ENABLE_TRACING` is set.
///
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
            return;
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        // Another subscriber may already be installed by the test harness, which is fine.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn env_filter(app_name: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let target = app_name.replace('-', "_");
        EnvFilter::new(format!(
            "{target}={DEFAULT_LOG_LEVEL},batchflow={DEFAULT_LOG_LEVEL}"
        ))
    })
}
