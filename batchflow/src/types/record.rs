use std::fmt;

use bytes::Bytes;

/// Identifier of a [`Record`].
///
/// Identifiers are assigned by the source and are only unique within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable unit of data flowing through a pipeline.
///
/// The payload is an opaque blob the pipeline never inspects. [`Bytes`] makes clones cheap, so a
/// batch can be kept for a retry while the destination holds its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    value: Bytes,
}

impl Record {
    pub fn new(id: RecordId, value: impl Into<Bytes>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Consumes the record and returns its identifier and payload.
    pub fn into_parts(self) -> (RecordId, Bytes) {
        (self.id, self.value)
    }
}
