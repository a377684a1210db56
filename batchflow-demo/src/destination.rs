use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use batchflow::destination::Destination;
use batchflow::error::{ErrorKind, FlowResult};
use batchflow::flow_error;
use batchflow::types::Record;
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    id: u64,
    value: Cow<'a, str>,
}

/// Destination appending every record as one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesDestination {
    file: Arc<Mutex<BufWriter<File>>>,
}

impl JsonLinesDestination {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            file: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }
}

fn encode_batch(batch: &[Record]) -> FlowResult<Vec<u8>> {
    let mut encoded = Vec::new();

    for record in batch {
        let line = RecordLine {
            id: record.id().into_inner(),
            value: String::from_utf8_lossy(record.value()),
        };

        serde_json::to_writer(&mut encoded, &line).map_err(|err| {
            flow_error!(
                ErrorKind::SerializationError,
                "Failed to encode a record",
                format!("Record {} could not be encoded: {err}", record.id()),
                source: err
            )
        })?;
        encoded.push(b'\n');
    }

    Ok(encoded)
}

impl Destination for JsonLinesDestination {
    fn name() -> &'static str {
        "json_lines"
    }

    async fn shutdown(&self) -> FlowResult<()> {
        let mut file = self.file.lock().await;
        file.flush().await.map_err(|err| {
            flow_error!(
                ErrorKind::DestinationError,
                "Failed to flush the output file",
                err.to_string(),
                source: err
            )
        })
    }

    async fn send(&self, batch: &[Record]) -> FlowResult<()> {
        let encoded = encode_batch(batch)?;

        let mut file = self.file.lock().await;
        let write_result = async {
            file.write_all(&encoded).await?;
            file.flush().await
        }
        .await;

        write_result.map_err(|err| {
            flow_error!(
                ErrorKind::DestinationError,
                "Failed to write a batch to the output file",
                err.to_string(),
                source: err
            )
        })?;

        debug!(batch_size = batch.len(), bytes = encoded.len(), "batch written");

        Ok(())
    }
}
