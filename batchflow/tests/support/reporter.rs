use std::sync::{Arc, Mutex};

use batchflow::error::{ErrorKind, FlowError};
use batchflow::reporter::ErrorReporter;
use batchflow::types::Record;

#[derive(Debug, Default)]
struct Reports {
    rejected_batches: Vec<(ErrorKind, Vec<u64>)>,
    fatal_errors: Vec<Vec<ErrorKind>>,
}

/// [`ErrorReporter`] keeping every report so tests can assert on them.
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorReporter {
    reports: Arc<Mutex<Reports>>,
}

impl RecordingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind and record ids of every reported batch, in report order.
    pub fn rejected_batches(&self) -> Vec<(ErrorKind, Vec<u64>)> {
        self.reports.lock().unwrap().rejected_batches.clone()
    }

    /// Returns the kinds of every reported fatal error.
    pub fn fatal_errors(&self) -> Vec<Vec<ErrorKind>> {
        self.reports.lock().unwrap().fatal_errors.clone()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report_rejected_batch(&self, error: &FlowError, batch: &[Record]) {
        let record_ids = batch.iter().map(|record| record.id().into_inner()).collect();
        self.reports
            .lock()
            .unwrap()
            .rejected_batches
            .push((error.kind(), record_ids));
    }

    fn report_fatal(&self, error: &FlowError) {
        self.reports.lock().unwrap().fatal_errors.push(error.kinds());
    }
}
