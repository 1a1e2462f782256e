//! Isolated test environment with on-disk storage.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tempfile::TempDir;
use veriseal_attestation::EventSigner;
use veriseal_core::SealedEvent;
use veriseal_ledger::{AnchorStore, HashChain};

use crate::events::EventBuilder;

/// Per-test environment: temp data directory, ephemeral signer, open chain.
///
/// The temp directory is removed when the environment drops, so tests
/// never leak state into each other.
pub struct TestEnv {
    dir: TempDir,
    /// Signer sealing events in this environment.
    pub signer: Arc<EventSigner>,
    /// Hash chain writing to the environment's event log.
    pub chain: Arc<HashChain>,
}

impl TestEnv {
    /// Creates a fresh environment with an empty event log.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp directory or chain cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let signer = Arc::new(EventSigner::ephemeral());
        let chain = Arc::new(HashChain::open(&dir.path().join("events.jsonl"), signer.clone())?);
        Ok(Self { dir, signer, chain })
    }

    /// Path of the event log inside this environment.
    pub fn events_path(&self) -> PathBuf {
        self.dir.path().join("events.jsonl")
    }

    /// Path of the anchor records file inside this environment.
    pub fn anchors_path(&self) -> PathBuf {
        self.dir.path().join("anchors.jsonl")
    }

    /// Opens an anchor store over this environment's records file.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn anchor_store(&self) -> Result<AnchorStore> {
        Ok(AnchorStore::open(self.anchors_path())?)
    }

    /// Root of the environment's data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Seals `n` default events named `E0..E{n-1}`.
    ///
    /// # Errors
    ///
    /// Propagates chain append failures.
    pub async fn seal_batch(&self, n: usize) -> Result<Vec<SealedEvent>> {
        let mut sealed = Vec::with_capacity(n);
        for i in 0..n {
            let event = EventBuilder::new(&format!("E{i}")).build();
            sealed.push(self.chain.append(event).await?);
        }
        Ok(sealed)
    }

    /// Re-opens a second chain over the same log, replaying it.
    ///
    /// Models a process restart: the accumulator is rebuilt from the
    /// persisted log with full re-verification.
    ///
    /// # Errors
    ///
    /// Propagates replay verification failures.
    pub fn reopen_chain(&self) -> Result<HashChain> {
        Ok(HashChain::open(&self.events_path(), self.signer.clone())?)
    }
}
