//! The order-independent unique-record set

use crate::corpus::checkpoint::write_checkpoint;
use crate::corpus::{CorpusError, Record};
use std::collections::BTreeSet;
use std::path::Path;

/// Accumulates the unique records collected for one crawl job
///
/// Records are held in a `BTreeSet`, so iteration is already in the total
/// lexicographic tuple order the checkpoint format requires regardless of
/// arrival order. `checkpoint` is not internally synchronized; the pipeline's
/// one-deep parse barrier guarantees no two writers touch it concurrently.
#[derive(Debug, Default)]
pub struct Deduplicator {
    records: BTreeSet<Record>,
}

impl Deduplicator {
    /// Creates an empty deduplicator
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning true if it was newly added
    pub fn insert(&mut self, record: Record) -> bool {
        self.records.insert(record)
    }

    /// Number of unique records collected so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been collected
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the corpus in checkpoint order
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Rewrites the checkpoint file with the full current corpus
    ///
    /// The file is always the whole corpus, sorted, truncate+rewrite - never
    /// an append. Only the latest checkpoint is authoritative.
    pub fn checkpoint(&self, path: &Path) -> Result<(), CorpusError> {
        write_checkpoint(path, self.records.iter())
    }
}
