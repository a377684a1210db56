use std::time::Duration;

use batchflow::error::{ErrorKind, FlowResult};
use batchflow::source::Source;
use batchflow::types::{Record, RecordId};
use batchflow::{bail, flow_error};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::timeout;

/// Source turning every non-blank line of a reader into a record.
///
/// A fetch waits as long as needed for the first line, then keeps collecting lines for as long as
/// they arrive within the linger delay, up to the per-fetch limit. Lines already read are kept in
/// the source when a fetch is cancelled and returned by the next one.
#[derive(Debug)]
pub struct LineSource<R> {
    lines: Lines<R>,
    pending: Vec<Record>,
    next_id: u64,
    max_records_per_fetch: usize,
    linger: Duration,
    reached_eof: bool,
}

impl LineSource<BufReader<Stdin>> {
    /// Creates a source reading from the process standard input.
    pub fn stdin(max_records_per_fetch: usize, linger: Duration) -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            max_records_per_fetch,
            linger,
        )
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, max_records_per_fetch: usize, linger: Duration) -> Self {
        Self {
            lines: reader.lines(),
            pending: Vec::new(),
            next_id: 0,
            max_records_per_fetch: max_records_per_fetch.max(1),
            linger,
            reached_eof: false,
        }
    }

    async fn next_line(&mut self) -> Option<std::io::Result<Option<String>>> {
        if self.pending.is_empty() {
            return Some(self.lines.next_line().await);
        }

        timeout(self.linger, self.lines.next_line()).await.ok()
    }
}

impl<R> Source for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn fetch(&mut self) -> FlowResult<Vec<Record>> {
        while !self.reached_eof && self.pending.len() < self.max_records_per_fetch {
            let Some(next_line) = self.next_line().await else {
                break;
            };

            match next_line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    self.pending.push(Record::new(RecordId(self.next_id), line));
                    self.next_id += 1;
                }
                Ok(None) => self.reached_eof = true,
                Err(err) => {
                    return Err(flow_error!(
                        ErrorKind::SourceError,
                        "Failed to read a line",
                        err.to_string(),
                        source: err
                    ));
                }
            }
        }

        if self.pending.is_empty() && self.reached_eof {
            bail!(ErrorKind::SourceExhausted, "Reached the end of the input");
        }

        Ok(std::mem::take(&mut self.pending))
    }
}
