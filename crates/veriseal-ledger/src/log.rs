//! Append-only event log.
//!
//! Line-delimited JSON, one sealed event per line, never rewritten. The
//! log is the system of record: the Merkle accumulator and chain state are
//! rebuilt from it on every restart.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use veriseal_core::SealedEvent;

use crate::error::{LedgerError, Result};

/// Writer handle for the append-only event log.
///
/// Exactly one `EventLog` writes at a time; it is owned by the hash chain
/// and only touched inside its critical section.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: File,
}

impl EventLog {
    /// Opens the log for appending, creating it (and parent directories)
    /// if absent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn open_append(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    /// Appends one sealed event as a JSON line and syncs it to disk.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for an unencodable record or an I/O
    /// error for a failed write. On error nothing is considered appended;
    /// the caller rolls back its in-memory state.
    pub fn append(&mut self, sealed: &SealedEvent) -> Result<()> {
        let mut line = serde_json::to_vec(sealed)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every sealed event from a log file in order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CorruptLog` naming the first line that fails
    /// to parse, or an I/O error if the file cannot be read.
    pub fn read_all(path: &Path) -> Result<Vec<SealedEvent>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sealed: SealedEvent = serde_json::from_str(&line).map_err(|e| {
                LedgerError::CorruptLog { line: i + 1, reason: format!("unparseable record: {e}") }
            })?;
            events.push(sealed);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use veriseal_core::{ClockSync, EventRecord, EventType, Tier, VCP_VERSION};

    use super::*;

    fn sealed(event_id: &str, index: u64) -> SealedEvent {
        SealedEvent {
            event: EventRecord {
                vcp_version: VCP_VERSION.to_string(),
                event_id: event_id.to_string(),
                timestamp: "2025-06-15T12:00:00.000Z".to_string(),
                event_type: EventType::OrderNew,
                tier: Tier::Silver,
                policy_id: "urn:vso:policy:test:v1".to_string(),
                clock_sync: ClockSync::BestEffort,
                system_id: "sys".to_string(),
                account_id: "acct".to_string(),
                payload: json!({"k": "v"}),
            },
            prev_hash: None,
            event_hash: "00".repeat(32),
            signature: "c2ln".to_string(),
            merkle_index: index,
            signer_key_id: "key".to_string(),
        }
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut log = EventLog::open_append(&path).unwrap();
        log.append(&sealed("E0", 0)).unwrap();
        log.append(&sealed("E1", 1)).unwrap();

        let events = EventLog::read_all(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.event_id, "E0");
        assert_eq!(events[1].merkle_index, 1);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/events.jsonl");
        EventLog::open_append(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        EventLog::open_append(&path).unwrap().append(&sealed("E0", 0)).unwrap();
        EventLog::open_append(&path).unwrap().append(&sealed("E1", 1)).unwrap();

        assert_eq!(EventLog::read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn unparseable_line_reports_its_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut log = EventLog::open_append(&path).unwrap();
        log.append(&sealed("E0", 0)).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();

        let err = EventLog::read_all(&path).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptLog { line: 2, .. }), "got {err}");
    }
}
