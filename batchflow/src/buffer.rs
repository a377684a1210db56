//! Ordered, bounded accumulator of records waiting to be flushed.

use std::collections::VecDeque;

use crate::types::Record;

/// FIFO buffer of pending records with a flush threshold and a hard capacity.
///
/// Records leave the buffer strictly from the front, so the arrival order is kept within a batch
/// and across successive batches. The buffer is owned by the flush worker and only mutated from
/// its task, which makes every check-and-extract operation atomic with respect to appends.
#[derive(Debug)]
pub struct BatchBuffer {
    records: VecDeque<Record>,
    flush_threshold: usize,
    capacity: usize,
}

impl BatchBuffer {
    /// Creates an empty buffer.
    ///
    /// `capacity` is expected to be greater than `flush_threshold`, otherwise a full buffer can
    /// never be flushed. [`batchflow_config::shared::BatchConfig::validate`] enforces it.
    pub fn new(flush_threshold: usize, capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(flush_threshold.saturating_mul(2))),
            flush_threshold,
            capacity,
        }
    }

    /// Appends `records` to the tail, in order, as long as they fit.
    ///
    /// Returns the records that did not fit, still in order, or `None` when all of them were
    /// admitted. The caller decides whether to hold the remainder (backpressure) or drop it.
    pub fn append(&mut self, mut records: Vec<Record>) -> Option<Vec<Record>> {
        let admitted = records.len().min(self.remaining_capacity());
        let remainder = records.split_off(admitted);
        self.records.extend(records);

        if remainder.is_empty() {
            None
        } else {
            Some(remainder)
        }
    }

    /// Removes and returns the first `flush_threshold` records when the buffer holds strictly
    /// more than `flush_threshold` records.
    ///
    /// A buffer holding exactly `flush_threshold` records is left untouched.
    pub fn try_extract_batch(&mut self) -> Option<Vec<Record>> {
        if self.records.len() <= self.flush_threshold {
            return None;
        }

        Some(self.records.drain(..self.flush_threshold).collect())
    }

    /// Puts a batch back at the front, ahead of newer records, keeping its internal order.
    pub fn requeue_front(&mut self, batch: Vec<Record>) {
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
    }

    /// Removes up to `count` records from the front.
    pub fn take_front(&mut self, count: usize) -> Vec<Record> {
        let count = count.min(self.records.len());
        self.records.drain(..count).collect()
    }

    /// Removes every record, in order.
    pub fn drain_all(&mut self) -> Vec<Record> {
        self.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.records.len())
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
