//! Hash chain: the seal pipeline's single-writer critical section.
//!
//! `append` is the linearization point of the pipeline. Under one lock it
//! links `prev_hash`, canonicalizes, hashes, signs, assigns the dense
//! `merkle_index`, grows the Merkle accumulator and persists the sealed
//! event. If the disk write fails, the accumulator is rolled back and the
//! counter is not advanced, so the five chain invariants always hold for
//! observable state.
//!
//! Readers take the same lock for a consistent snapshot and release it
//! before doing any I/O of their own.

use std::{collections::HashMap, path::Path, sync::Arc};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::sync::Mutex;
use tracing::{debug, info};
use veriseal_attestation::{EventSigner, InclusionProof, MerkleAccumulator};
use veriseal_core::{EventRecord, SealedEvent};

use crate::{
    error::{LedgerError, Result},
    log::EventLog,
};

/// Consistent view of the accumulator taken under the chain lock.
///
/// `root` corresponds exactly to leaves `[0, size)`; the anchor scheduler
/// persists this pair so a later verifier can recompute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Number of sealed events at snapshot time.
    pub size: u64,
    /// Merkle root over those events; `None` for an empty tree.
    pub root: Option<[u8; 32]>,
}

struct ChainState {
    events: Vec<SealedEvent>,
    index_by_event_id: HashMap<String, u64>,
    prev_hash: Option<String>,
    merkle: MerkleAccumulator,
    log: EventLog,
}

/// Serialized writer over the event log, counter and Merkle accumulator.
pub struct HashChain {
    signer: Arc<EventSigner>,
    state: Mutex<ChainState>,
}

impl std::fmt::Debug for HashChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChain").field("signer_key_id", &self.signer.key_id()).finish()
    }
}

impl HashChain {
    /// Opens the chain over a log file, replaying any existing records.
    ///
    /// Replay re-verifies every stored event hash, the `prev_hash` links
    /// and index density before the accumulator is rebuilt. A log that
    /// fails verification refuses to open; the process must not accept new
    /// writes over corrupt history.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::CorruptLog` naming the first bad line, or an
    /// I/O error if the log cannot be read or opened for append.
    pub fn open(path: &Path, signer: Arc<EventSigner>) -> Result<Self> {
        let events = if path.exists() { EventLog::read_all(path)? } else { Vec::new() };

        let mut merkle = MerkleAccumulator::new();
        let mut index_by_event_id = HashMap::with_capacity(events.len());
        let mut prev_hash: Option<String> = None;

        for (i, sealed) in events.iter().enumerate() {
            let line = i + 1;

            if sealed.merkle_index != i as u64 {
                return Err(LedgerError::CorruptLog {
                    line,
                    reason: format!(
                        "merkle_index {} does not match log position {i}",
                        sealed.merkle_index
                    ),
                });
            }

            if sealed.prev_hash != prev_hash {
                return Err(LedgerError::CorruptLog {
                    line,
                    reason: format!(
                        "prev_hash {:?} does not match previous event hash {:?}",
                        sealed.prev_hash, prev_hash
                    ),
                });
            }

            let digest = sealed.recompute_digest().map_err(|e| LedgerError::CorruptLog {
                line,
                reason: format!("payload is not canonicalizable: {e}"),
            })?;
            if hex::encode(digest) != sealed.event_hash {
                return Err(LedgerError::CorruptLog {
                    line,
                    reason: format!(
                        "event hash mismatch: stored {} recomputed {}",
                        sealed.event_hash,
                        hex::encode(digest)
                    ),
                });
            }

            merkle.append(&digest);
            index_by_event_id.insert(sealed.event.event_id.clone(), i as u64);
            prev_hash = Some(sealed.event_hash.clone());
        }

        if !events.is_empty() {
            info!(events = events.len(), path = %path.display(), "event log replayed");
        }

        let log = EventLog::open_append(path)?;
        Ok(Self {
            signer,
            state: Mutex::new(ChainState { events, index_by_event_id, prev_hash, merkle, log }),
        })
    }

    /// Seals one event: the pipeline's only write path.
    ///
    /// Validates, links, hashes, signs, indexes, accumulates and persists
    /// atomically with respect to every other chain operation.
    ///
    /// # Errors
    ///
    /// Client errors (schema, canonicalization) reject the event before
    /// any side effect. A log write failure rolls the accumulator back to
    /// its pre-call state and surfaces as a server error; the next append
    /// reuses the same index.
    pub async fn append(&self, event: EventRecord) -> Result<SealedEvent> {
        event.validate()?;

        let mut state = self.state.lock().await;

        let prev_hash = state.prev_hash.clone();
        let digest = event.digest(prev_hash.as_deref())?;
        let signature = self.signer.sign_digest(&digest);
        let merkle_index = state.events.len() as u64;

        let sealed = SealedEvent {
            event,
            prev_hash,
            event_hash: hex::encode(digest),
            signature: BASE64.encode(signature),
            merkle_index,
            signer_key_id: self.signer.key_id().to_string(),
        };

        let leaves_before = state.merkle.len();
        state.merkle.append(&digest);

        if let Err(e) = state.log.append(&sealed) {
            state.merkle.truncate(leaves_before);
            return Err(e);
        }

        state.prev_hash = Some(sealed.event_hash.clone());
        state.index_by_event_id.insert(sealed.event.event_id.clone(), merkle_index);
        state.events.push(sealed.clone());

        debug!(
            event_id = %sealed.event.event_id,
            merkle_index,
            event_hash = %sealed.event_hash,
            "event sealed"
        );
        Ok(sealed)
    }

    /// Number of sealed events.
    pub async fn len(&self) -> u64 {
        self.state.lock().await.events.len() as u64
    }

    /// Whether the chain holds no events yet.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.events.is_empty()
    }

    /// Takes a consistent `(size, root)` snapshot for anchoring.
    pub async fn snapshot(&self) -> TreeSnapshot {
        let state = self.state.lock().await;
        TreeSnapshot { size: state.events.len() as u64, root: state.merkle.root().ok() }
    }

    /// Looks up a sealed event by its identifier.
    pub async fn get_event(&self, event_id: &str) -> Option<SealedEvent> {
        let state = self.state.lock().await;
        let index = *state.index_by_event_id.get(event_id)?;
        state.events.get(index as usize).cloned()
    }

    /// Extracts the inclusion proof for an event against the current tree.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownEvent` for an unknown identifier.
    pub async fn inclusion_proof_for(&self, event_id: &str) -> Result<InclusionProof> {
        let state = self.state.lock().await;
        let index = *state
            .index_by_event_id
            .get(event_id)
            .ok_or_else(|| LedgerError::UnknownEvent { event_id: event_id.to_string() })?;
        Ok(state.merkle.inclusion_proof(index)?)
    }

    /// Key identifier of the signer sealing new events.
    pub fn signer_key_id(&self) -> &str {
        self.signer.key_id()
    }

    /// Verifies a signature over a digest for a named key.
    ///
    /// Only the active signing key is held in-process; a `signer_key_id`
    /// from a rotated-out key reports `false` here and is resolved by the
    /// offline verifier's key set instead.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed signature bytes.
    pub fn verify_signature(
        &self,
        signer_key_id: &str,
        digest: &[u8; 32],
        signature: &[u8],
    ) -> Result<bool> {
        if signer_key_id != self.signer.key_id() {
            return Ok(false);
        }
        Ok(self.signer.verify_digest(digest, signature)?)
    }
}
