use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::destination::Destination;
use crate::error::FlowResult;
use crate::types::Record;

#[derive(Debug, Default)]
struct Inner {
    batches: Vec<Vec<Record>>,
    shutdown_called: bool,
}

/// In-memory destination for testing and development purposes.
///
/// [`MemoryDestination`] keeps every batch it receives, in order, so tests can inspect exactly
/// what the pipeline delivered. Clones share the same storage.
///
/// # Examples
///
/// ```rust,no_run
/// use batchflow::destination::memory::MemoryDestination;
/// use batchflow::pipeline::Pipeline;
/// use batchflow::source::memory::MemorySource;
/// use batchflow_config::shared::PipelineConfig;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let destination = MemoryDestination::new();
/// let source = MemorySource::from_batches(vec![]);
///
/// let mut pipeline = Pipeline::new(PipelineConfig::default(), source, destination.clone());
/// pipeline.start().await?;
/// pipeline.wait().await?;
///
/// println!("received {} batches", destination.batches().await.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all batches received so far, in delivery order.
    pub async fn batches(&self) -> Vec<Vec<Record>> {
        self.inner.lock().await.batches.clone()
    }

    /// Returns all received records flattened in delivery order.
    pub async fn records(&self) -> Vec<Record> {
        let inner = self.inner.lock().await;
        inner.batches.iter().flatten().cloned().collect()
    }

    /// Returns whether [`Destination::shutdown`] has been called.
    pub async fn shutdown_called(&self) -> bool {
        self.inner.lock().await.shutdown_called
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn shutdown(&self) -> FlowResult<()> {
        self.inner.lock().await.shutdown_called = true;

        Ok(())
    }

    async fn send(&self, batch: &[Record]) -> FlowResult<()> {
        let mut inner = self.inner.lock().await;

        info!(batch_size = batch.len(), "writing a batch of records");
        for record in batch {
            debug!(record_id = %record.id(), "  {:?}", record.value());
        }
        inner.batches.push(batch.to_vec());

        Ok(())
    }
}
