//! RFC 6962 Merkle tree accumulation and inclusion proofs.
//!
//! Maintains an incrementally grown binary Merkle tree over the ordered
//! sequence of 32-byte event digests. Domain separation is mandatory:
//! leaves hash as `SHA-256(0x00 || d)` and interior nodes as
//! `SHA-256(0x01 || L || R)`, which prevents second-preimage attacks via
//! leaf/node confusion.
//!
//! Tree shape follows RFC 6962 §2.1 exactly: for n leaves, the split point
//! k is the largest power of two strictly smaller than n, and the root is
//! `node(MTH(D[0:k]), MTH(D[k:n]))`. The right spine is asymmetric when n
//! is not a power of two; odd nodes are never duplicated or padded.

use sha2::{Digest, Sha256};

use crate::error::{AttestationError, Result};

/// RFC 6962 domain separation prefix for leaf hashes.
pub const LEAF_PREFIX: u8 = 0x00;

/// RFC 6962 domain separation prefix for interior node hashes.
pub const NODE_PREFIX: u8 = 0x01;

/// Computes the RFC 6962 leaf hash of an event digest.
pub fn leaf_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(digest);
    hasher.finalize().into()
}

/// Computes the RFC 6962 interior node hash of two children.
pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Which side of the path a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is the left child; current hash goes on the right.
    Left,
    /// Sibling is the right child; current hash goes on the left.
    Right,
}

/// One sibling hash along an inclusion proof path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofNode {
    /// Sibling subtree hash.
    pub hash: [u8; 32],
    /// Side of the sibling relative to the path.
    pub side: Side,
}

/// Inclusion proof for one leaf against a specific tree size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    /// Zero-based index of the proven leaf.
    pub leaf_index: u64,
    /// Number of leaves in the tree the proof was taken from.
    pub tree_size: u64,
    /// Sibling hashes from the leaf up to the root.
    pub path: Vec<ProofNode>,
    /// Root the proof resolves to.
    pub root: [u8; 32],
}

/// Incrementally grown RFC 6962 Merkle tree.
///
/// Appends are O(log n) amortized via a spine of perfect-subtree roots;
/// the full leaf-hash vector is retained for proof extraction. Given the
/// same ordered leaf sequence, every instance yields identical roots and
/// identical proofs, including right-edge handling.
#[derive(Debug, Clone, Default)]
pub struct MerkleAccumulator {
    /// Leaf hashes (domain-separated), in append order.
    leaves: Vec<[u8; 32]>,
    /// Roots of the perfect subtrees covering the leaves, largest first.
    /// Sizes follow the binary decomposition of `leaves.len()`.
    spine: Vec<([u8; 32], usize)>,
}

impl MerkleAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leaves in the tree.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Appends an event digest as the next leaf.
    ///
    /// Returns the zero-based index assigned to the leaf.
    pub fn append(&mut self, digest: &[u8; 32]) -> u64 {
        let index = self.leaves.len() as u64;
        let leaf = leaf_hash(digest);
        self.leaves.push(leaf);
        self.spine.push((leaf, 1));
        self.merge_spine();
        index
    }

    fn merge_spine(&mut self) {
        while self.spine.len() >= 2 {
            let (right, right_size) = self.spine[self.spine.len() - 1];
            let (left, left_size) = self.spine[self.spine.len() - 2];
            if left_size != right_size {
                break;
            }
            self.spine.truncate(self.spine.len() - 2);
            self.spine.push((node_hash(&left, &right), left_size + right_size));
        }
    }

    /// Returns the current root.
    ///
    /// Pure function of the leaf vector: folding the spine right-to-left
    /// reproduces the RFC 6962 recursive split.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::EmptyTree` when no leaves exist.
    pub fn root(&self) -> Result<[u8; 32]> {
        let mut iter = self.spine.iter().rev();
        let (mut acc, _) = *iter.next().ok_or(AttestationError::EmptyTree)?;
        for (hash, _) in iter {
            acc = node_hash(hash, &acc);
        }
        Ok(acc)
    }

    /// Extracts the inclusion proof for a leaf against the current tree.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::EmptyTree` for an empty tree or
    /// `AttestationError::IndexOutOfBounds` for an index past the edge.
    pub fn inclusion_proof(&self, index: u64) -> Result<InclusionProof> {
        if self.leaves.is_empty() {
            return Err(AttestationError::EmptyTree);
        }
        let tree_size = self.leaves.len() as u64;
        if index >= tree_size {
            return Err(AttestationError::IndexOutOfBounds { index, tree_size });
        }

        let mut path = Vec::new();
        audit_path(&self.leaves, index as usize, &mut path);
        Ok(InclusionProof { leaf_index: index, tree_size, path, root: self.root()? })
    }

    /// Drops leaves past `len`, restoring an earlier tree state.
    ///
    /// Rollback path for the seal pipeline: if persisting a sealed event
    /// fails after its leaf was appended, the accumulator must revert to
    /// the pre-append state before the error surfaces.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.leaves.len() {
            return;
        }
        self.leaves.truncate(len);
        self.spine.clear();
        // Rebuild by binary decomposition of the remaining leaf count.
        let mut offset = 0;
        let mut remaining = self.leaves.len();
        while remaining > 0 {
            let size = 1 << (usize::BITS - 1 - remaining.leading_zeros());
            let hash = subtree_root(&self.leaves[offset..offset + size]);
            self.spine.push((hash, size));
            offset += size;
            remaining -= size;
        }
    }
}

/// Computes the RFC 6962 root over a sequence of event digests in one shot.
///
/// Equivalent to appending each digest to a fresh accumulator; the
/// verifier uses this to recompute anchored roots from the log.
///
/// # Errors
///
/// Returns `AttestationError::EmptyTree` for an empty slice.
pub fn root_over(digests: &[[u8; 32]]) -> Result<[u8; 32]> {
    if digests.is_empty() {
        return Err(AttestationError::EmptyTree);
    }
    let leaves: Vec<[u8; 32]> = digests.iter().map(leaf_hash).collect();
    Ok(subtree_root(&leaves))
}

/// Verifies an inclusion proof.
///
/// `leaf` is the domain-separated leaf hash (`leaf_hash` of the event
/// digest). Pure function: folds the path onto the leaf and compares the
/// result with the expected root.
pub fn verify_inclusion(
    leaf: &[u8; 32],
    index: u64,
    tree_size: u64,
    path: &[ProofNode],
    root: &[u8; 32],
) -> bool {
    if index >= tree_size {
        return false;
    }
    let mut acc = *leaf;
    for node in path {
        acc = match node.side {
            Side::Left => node_hash(&node.hash, &acc),
            Side::Right => node_hash(&acc, &node.hash),
        };
    }
    acc == *root
}

/// MTH over a slice of leaf hashes, splitting at the largest power of two
/// strictly below the length.
fn subtree_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.len() == 1 {
        return leaves[0];
    }
    let k = split_point(leaves.len());
    node_hash(&subtree_root(&leaves[..k]), &subtree_root(&leaves[k..]))
}

fn audit_path(leaves: &[[u8; 32]], index: usize, path: &mut Vec<ProofNode>) {
    if leaves.len() == 1 {
        return;
    }
    let k = split_point(leaves.len());
    if index < k {
        audit_path(&leaves[..k], index, path);
        path.push(ProofNode { hash: subtree_root(&leaves[k..]), side: Side::Right });
    } else {
        audit_path(&leaves[k..], index - k, path);
        path.push(ProofNode { hash: subtree_root(&leaves[..k]), side: Side::Left });
    }
}

/// Largest power of two strictly less than `n`; requires `n > 1`.
fn split_point(n: usize) -> usize {
    debug_assert!(n > 1);
    1 << (usize::BITS - 1 - (n - 1).leading_zeros())
}
