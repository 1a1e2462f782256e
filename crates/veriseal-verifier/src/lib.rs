//! Offline verifier for the evidence chain.
//!
//! Consumes persisted artifacts only: the append-only event log, the
//! anchor records and one or more public key exports. Recomputes every
//! layer from scratch — canonical hashes, signatures, sequence density,
//! chain links, Merkle roots, anchor proofs — and reports each defect with
//! a specific diagnosis. The verifier never errors on bad evidence; bad
//! evidence is its output, not its failure mode.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod report;

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::VerifyingKey;
use veriseal_attestation::{root_over, verify_with_key, PublicKeyExport};
use veriseal_core::SealedEvent;
use veriseal_ledger::AnchorRecord;

pub use report::{CheckFailure, CheckKind, VerificationReport};

/// Set of trusted public keys, selected by `signer_key_id`.
///
/// Key rotation leaves multiple valid keys in circulation; every sealed
/// event names the key that signed it.
#[derive(Debug, Default, Clone)]
pub struct KeySet {
    keys: HashMap<String, VerifyingKey>,
}

impl KeySet {
    /// Creates an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a key set from public key export documents.
    ///
    /// # Errors
    ///
    /// Returns an error if any export holds malformed key material.
    pub fn from_exports(
        exports: &[PublicKeyExport],
    ) -> Result<Self, veriseal_attestation::AttestationError> {
        let mut keys = HashMap::with_capacity(exports.len());
        for export in exports {
            keys.insert(export.key_id.clone(), export.verifying_key()?);
        }
        Ok(Self { keys })
    }

    /// Adds a key under an identifier.
    pub fn insert(&mut self, key_id: String, key: VerifyingKey) {
        self.keys.insert(key_id, key);
    }

    /// Looks up a key by identifier.
    pub fn get(&self, key_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(key_id)
    }

    /// View of the keys keyed by identifier, for anchor verification.
    pub fn as_map(&self) -> &HashMap<String, VerifyingKey> {
        &self.keys
    }
}

/// Verifies a full evidence chain against its anchors and keys.
///
/// Checks run in order: per-event canonical hash, per-event signature,
/// sequence continuity, prev-hash chain, Merkle root per anchor, anchor
/// proof per anchor. The report is a pure function of the inputs.
pub fn verify_log(
    events: &[SealedEvent],
    anchors: &[AnchorRecord],
    keys: &KeySet,
) -> VerificationReport {
    let mut failures = Vec::new();

    check_event_hashes(events, &mut failures);
    check_signatures(events, keys, &mut failures);
    check_sequence(events, &mut failures);
    check_prev_hashes(events, &mut failures);
    check_merkle_roots(events, anchors, &mut failures);
    check_anchor_proofs(anchors, keys, &mut failures);

    VerificationReport { events_total: events.len(), anchors_total: anchors.len(), failures }
}

/// Check 1: recomputing the canonical hash reproduces `event_hash`.
fn check_event_hashes(events: &[SealedEvent], failures: &mut Vec<CheckFailure>) {
    for (i, sealed) in events.iter().enumerate() {
        match sealed.recompute_digest() {
            Ok(digest) => {
                let recomputed = hex::encode(digest);
                if recomputed != sealed.event_hash {
                    let observed = sealed.event_hash.clone();
                    failures.push(per_event(sealed, i, CheckKind::EventHash, recomputed, observed));
                }
            },
            Err(e) => failures.push(per_event(
                sealed,
                i,
                CheckKind::EventHash,
                "canonicalizable payload".to_string(),
                format!("canonicalization failed: {e}"),
            )),
        }
    }
}

/// Check 2: the signature verifies over the stored digest with the key
/// named by `signer_key_id`.
fn check_signatures(events: &[SealedEvent], keys: &KeySet, failures: &mut Vec<CheckFailure>) {
    for (i, sealed) in events.iter().enumerate() {
        let Some(digest) = decode_digest(&sealed.event_hash) else {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::Signature,
                "64 hex character event_hash".to_string(),
                sealed.event_hash.clone(),
            ));
            continue;
        };

        let Some(key) = keys.get(&sealed.signer_key_id) else {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::Signature,
                "known signer_key_id".to_string(),
                format!("no public key for {}", sealed.signer_key_id),
            ));
            continue;
        };

        let Ok(signature) = BASE64.decode(&sealed.signature) else {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::Signature,
                "base64 signature".to_string(),
                sealed.signature.clone(),
            ));
            continue;
        };

        let valid = verify_with_key(key, &digest, &signature).unwrap_or(false);
        if !valid {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::Signature,
                "valid Ed25519 signature over event digest".to_string(),
                "verification failed".to_string(),
            ));
        }
    }
}

/// Check 3: `merkle_index` values form 0, 1, …, n-1.
fn check_sequence(events: &[SealedEvent], failures: &mut Vec<CheckFailure>) {
    for (i, sealed) in events.iter().enumerate() {
        if sealed.merkle_index != i as u64 {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::Sequence,
                format!("merkle_index {i}"),
                format!("merkle_index {}", sealed.merkle_index),
            ));
        }
    }
}

/// Check 4: each event links to its predecessor's hash.
fn check_prev_hashes(events: &[SealedEvent], failures: &mut Vec<CheckFailure>) {
    for (i, sealed) in events.iter().enumerate() {
        let expected = if i == 0 { None } else { Some(events[i - 1].event_hash.as_str()) };
        if sealed.prev_hash.as_deref() != expected {
            failures.push(per_event(
                sealed,
                i,
                CheckKind::PrevHash,
                expected.map_or("no prev_hash".to_string(), str::to_string),
                sealed.prev_hash.clone().unwrap_or_else(|| "no prev_hash".to_string()),
            ));
        }
    }
}

/// Check 5: the tree rebuilt over stored digests matches each anchor.
fn check_merkle_roots(
    events: &[SealedEvent],
    anchors: &[AnchorRecord],
    failures: &mut Vec<CheckFailure>,
) {
    let digests: Vec<Option<[u8; 32]>> =
        events.iter().map(|s| decode_digest(&s.event_hash)).collect();

    for (a, anchor) in anchors.iter().enumerate() {
        let count = anchor.anchored_count as usize;
        if count == 0 || count > events.len() {
            failures.push(per_anchor(
                a,
                CheckKind::MerkleRoot,
                format!("anchored_count within 1..={}", events.len()),
                format!("anchored_count {count}"),
            ));
            continue;
        }

        let Some(window) = digests[..count].iter().copied().collect::<Option<Vec<[u8; 32]>>>()
        else {
            failures.push(per_anchor(
                a,
                CheckKind::MerkleRoot,
                "hex-decodable event hashes".to_string(),
                "undecodable event_hash in anchored window".to_string(),
            ));
            continue;
        };

        match root_over(&window) {
            Ok(root) => {
                let recomputed = hex::encode(root);
                if recomputed != anchor.merkle_root {
                    failures.push(per_anchor(
                        a,
                        CheckKind::MerkleRoot,
                        recomputed,
                        anchor.merkle_root.clone(),
                    ));
                }
            },
            Err(e) => failures.push(per_anchor(
                a,
                CheckKind::MerkleRoot,
                "recomputable Merkle root".to_string(),
                e.to_string(),
            )),
        }
    }
}

/// Check 6: each anchor's proof blob verifies for its recorded root.
fn check_anchor_proofs(anchors: &[AnchorRecord], keys: &KeySet, failures: &mut Vec<CheckFailure>) {
    for (a, anchor) in anchors.iter().enumerate() {
        let Some(root) = decode_digest(&anchor.merkle_root) else {
            failures.push(per_anchor(
                a,
                CheckKind::AnchorProof,
                "64 hex character merkle_root".to_string(),
                anchor.merkle_root.clone(),
            ));
            continue;
        };

        let Ok(blob) = BASE64.decode(&anchor.proof) else {
            failures.push(per_anchor(
                a,
                CheckKind::AnchorProof,
                "base64 proof blob".to_string(),
                "undecodable proof".to_string(),
            ));
            continue;
        };

        match veriseal_anchor::verify_offline(&anchor.provider, &root, &blob, keys.as_map()) {
            Ok(true) => {},
            Ok(false) => failures.push(per_anchor(
                a,
                CheckKind::AnchorProof,
                format!("valid {} proof for root {}", anchor.provider, anchor.merkle_root),
                "proof does not verify".to_string(),
            )),
            Err(e) => failures.push(per_anchor(
                a,
                CheckKind::AnchorProof,
                format!("well-formed {} proof", anchor.provider),
                e.to_string(),
            )),
        }
    }
}

fn per_event(
    sealed: &SealedEvent,
    index: usize,
    check: CheckKind,
    expected: String,
    observed: String,
) -> CheckFailure {
    CheckFailure {
        event_id: Some(sealed.event.event_id.clone()),
        index: Some(index as u64),
        check,
        expected,
        observed,
    }
}

fn per_anchor(index: usize, check: CheckKind, expected: String, observed: String) -> CheckFailure {
    CheckFailure { event_id: None, index: Some(index as u64), check, expected, observed }
}

fn decode_digest(hex_str: &str) -> Option<[u8; 32]> {
    hex::decode(hex_str).ok()?.try_into().ok()
}
