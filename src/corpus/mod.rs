//! Corpus module: the record store for one crawl job
//!
//! This module provides:
//!
//! - `Record`: a parsed registry entry, used whole as its own dedup key
//! - `Deduplicator`: an order-independent unique-record set
//! - checkpoint rendering and atomic rewrite of the durable output file

mod checkpoint;
mod dedup;

pub use checkpoint::{render_checkpoint, write_checkpoint};
pub use dedup::Deduplicator;

use thiserror::Error;

/// Errors that can occur while checkpointing the corpus
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace checkpoint file: {0}")]
    Persist(String),

    #[error("Checkpoint path has no parent directory: {0}")]
    BadPath(String),
}

/// One registry entry
///
/// All five fields participate in identity: two records are duplicates only
/// when every field matches exactly, embedded whitespace included. Field
/// declaration order is the lexicographic checkpoint sort order, so the
/// derived `Ord` is the total order the checkpoint file uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    pub name: String,
    pub address: String,
    pub status: String,
    pub registration_date: String,
    pub entity_type: String,
}

impl Record {
    /// The record's fields in checkpoint order
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.name,
            &self.address,
            &self.status,
            &self.registration_date,
            &self.entity_type,
        ]
    }
}
