//! Cryptographic attestation primitives.
//!
//! Provides Ed25519 digest signing and RFC 6962 compliant Merkle tree
//! accumulation with inclusion proofs for the tamper-evident audit trail.

#![warn(missing_docs)]

pub mod error;
pub mod merkle;
pub mod signing;

pub use error::{AttestationError, Result};
pub use merkle::{
    leaf_hash, node_hash, root_over, verify_inclusion, InclusionProof, MerkleAccumulator,
    ProofNode, Side,
};
pub use signing::{verify_with_key, EventSigner, PublicKeyExport};
