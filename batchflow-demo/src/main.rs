//! Demo binary for batchflow.
//!
//! Reads records from standard input, one per line, and appends them in batches to a JSON lines
//! file. Stops at the end of the input or on SIGINT/SIGTERM.

use std::time::Duration;

use batchflow::pipeline::Pipeline;
use batchflow_telemetry::tracing::init_tracing;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::config::{DemoConfig, load_demo_config};
use crate::destination::JsonLinesDestination;
use crate::error::DemoResult;
use crate::source::LineSource;

mod config;
mod destination;
mod error;
mod source;

/// Upper bound on the time spent waiting for runtime tasks once the pipeline has stopped.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> DemoResult<()> {
    let config = load_demo_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    run_to_completion(runtime, async_main(config))
}

/// Drives `future` to completion, then shuts `runtime` down without waiting more than
/// [`RUNTIME_SHUTDOWN_TIMEOUT`] for its remaining tasks.
///
/// Reading stdin occupies a blocking thread until the next line arrives, a plain runtime drop
/// would wait for it after a signal.
fn run_to_completion<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    output
}

async fn async_main(config: DemoConfig) -> DemoResult<()> {
    let source = LineSource::stdin(config.max_records_per_fetch, config.fetch_linger());
    let destination = JsonLinesDestination::open(&config.output_path).await?;

    info!(output_path = %config.output_path.display(), "writing records");

    let mut pipeline = Pipeline::new(config.pipeline, source, destination);
    let status_handle = pipeline.status_handle();

    pipeline.start().await?;

    tokio::select! {
        _ = shutdown_signal() => {
            pipeline.stop();
        }
        _ = status_handle.wait_until_stopped() => {}
    }

    let result = pipeline.wait().await;

    let status = status_handle.status();
    info!(
        stop_reason = ?status.stop_reason,
        delivered = status.delivered,
        failed_records = status.failed_records,
        held = status.held,
        overflowed = status.overflowed,
        discarded = status.discarded,
        "pipeline stopped"
    );

    result?;

    Ok(())
}

/// Completes once the process receives SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("sigint (ctrl+c) received, stopping pipeline");
                    }
                    _ = sigterm.recv() => {
                        info!("sigterm received, stopping pipeline");
                    }
                }

                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to register the sigterm handler, only listening for sigint");
            }
        }
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for sigint, the pipeline can only stop on its own");
        std::future::pending::<()>().await;
    }

    info!("sigint (ctrl+c) received, stopping pipeline");
}
