use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{ErrorKind, FlowResult};
use crate::flow_error;
use crate::source::Source;
use crate::types::Record;

#[derive(Debug, Default)]
struct Inner {
    script: VecDeque<FlowResult<Vec<Record>>>,
    fetches: u64,
}

/// In-memory source replaying a scripted list of fetch outcomes.
///
/// Every call to [`Source::fetch`] pops the next outcome. Once the script is empty the source
/// reports [`ErrorKind::SourceExhausted`]. Clones share the same script, which lets a test keep a
/// handle on a source it moved into a pipeline.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl MemorySource {
    /// Creates a source replaying `script` in order.
    pub fn new(script: impl IntoIterator<Item = FlowResult<Vec<Record>>>) -> Self {
        let inner = Inner {
            script: script.into_iter().collect(),
            fetches: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            delay: None,
        }
    }

    /// Creates a source returning each of `batches` from one fetch.
    pub fn from_batches(batches: impl IntoIterator<Item = Vec<Record>>) -> Self {
        Self::new(batches.into_iter().map(Ok))
    }

    /// Makes every fetch suspend for `delay` before returning, simulating slow I/O.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns how many fetches have completed.
    pub async fn fetch_count(&self) -> u64 {
        self.inner.lock().await.fetches
    }
}

impl Source for MemorySource {
    async fn fetch(&mut self) -> FlowResult<Vec<Record>> {
        // Sleeping before touching the script keeps the fetch cancel safe.
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        inner.fetches += 1;

        match inner.script.pop_front() {
            Some(outcome) => outcome,
            None => Err(flow_error!(
                ErrorKind::SourceExhausted,
                "Memory source script is exhausted"
            )),
        }
    }
}
