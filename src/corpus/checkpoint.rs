//! Checkpoint rendering and atomic rewrite
//!
//! A checkpoint is the job's only durable output: one block per record with
//! the five fields newline-joined, blocks separated by a blank line, blocks
//! in lexicographic tuple order. The file is replaced via a temp file in the
//! same directory followed by a rename, so a crash mid-write never leaves a
//! truncated checkpoint behind.

use crate::corpus::{CorpusError, Record};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Renders records into the checkpoint text format
///
/// The caller is responsible for passing records already in checkpoint order;
/// `Deduplicator::iter` does so.
pub fn render_checkpoint<'a>(records: impl Iterator<Item = &'a Record>) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.fields().join("\n"));
        out.push_str("\n\n");
    }
    out
}

/// Atomically replaces the checkpoint file at `path` with a fresh snapshot
pub fn write_checkpoint<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a Record>,
) -> Result<(), CorpusError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| CorpusError::BadPath(path.display().to_string()))?;
    std::fs::create_dir_all(parent)?;

    let rendered = render_checkpoint(records);

    // Temp file in the same directory so the rename cannot cross filesystems
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(rendered.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path)
        .map_err(|e| CorpusError::Persist(e.to_string()))?;

    Ok(())
}
