//! Anchor record persistence.
//!
//! One JSON document per anchor event, appended to a line-delimited file
//! and never mutated. Anchors are cumulative: each one commits to every
//! event from 0 through `anchored_count - 1`, and the gap between
//! `prev_anchor_count` and `anchored_count` is the newly covered window.

use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Persisted attestation that the first `anchored_count` events commit to
/// `merkle_root` at `anchored_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Number of events covered by this anchor.
    pub anchored_count: u64,
    /// Hex Merkle root over events `[0, anchored_count)`.
    pub merkle_root: String,
    /// Identifier of the provider that produced the proof.
    pub provider: String,
    /// Base64-encoded opaque proof blob returned by the provider.
    pub proof: String,
    /// ISO-8601 timestamp reported by the provider.
    pub anchored_at: String,
    /// `anchored_count` of the previous anchor, or 0 for the first.
    pub prev_anchor_count: u64,
}

/// Append-only store of anchor records.
#[derive(Debug, Clone)]
pub struct AnchorStore {
    path: PathBuf,
}

impl AnchorStore {
    /// Opens the store at the given path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Appends one anchor record.
    ///
    /// # Errors
    ///
    /// Returns a serialization or I/O error; the record is not considered
    /// persisted on failure.
    pub fn append(&self, record: &AnchorRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    /// Reads every anchor record in order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CorruptLog` naming the first unparseable
    /// line; a missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<AnchorRecord>> {
        Self::read_all_from(&self.path)
    }

    /// Reads anchor records from an arbitrary path (verifier input).
    ///
    /// # Errors
    ///
    /// As [`AnchorStore::read_all`].
    pub fn read_all_from(path: &Path) -> Result<Vec<AnchorRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(path)?);

        let mut records = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AnchorRecord = serde_json::from_str(&line).map_err(|e| {
                LedgerError::CorruptLog {
                    line: i + 1,
                    reason: format!("unparseable anchor record: {e}"),
                }
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Returns the most recent anchor record, if any.
    ///
    /// # Errors
    ///
    /// As [`AnchorStore::read_all`].
    pub fn last(&self) -> Result<Option<AnchorRecord>> {
        Ok(self.read_all()?.pop())
    }

    /// Path of the underlying records file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
