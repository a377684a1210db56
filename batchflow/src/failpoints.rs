use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, FlowResult};

pub const AFTER_SOURCE_FETCH: &str = "flush_worker.after_source_fetch";
pub const BEFORE_DESTINATION_SEND: &str = "flush_worker.before_destination_send";

/// Returns an error when the fail point `name` is configured to `return`.
///
/// The optional return parameter selects the kind of the error, so one fail point can simulate a
/// transient, a terminal or a fatal failure.
pub fn flow_fail_point(name: &str) -> FlowResult<()> {
    fail_point!(name, |parameter| {
        let error_kind = match parameter.as_deref() {
            Some("source_error") => ErrorKind::SourceError,
            Some("source_exhausted") => ErrorKind::SourceExhausted,
            Some("destination_rejected") => ErrorKind::DestinationRejected,
            Some("unknown") => ErrorKind::Unknown,
            _ => ErrorKind::DestinationError,
        };

        bail!(
            error_kind,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
