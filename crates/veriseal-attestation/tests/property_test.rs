//! Property-based tests for attestation invariants.
//!
//! Uses randomly generated inputs to verify that the cryptographic
//! invariants hold regardless of digest content or tree size.

use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use veriseal_attestation::{
    leaf_hash, root_over, verify_inclusion, EventSigner, MerkleAccumulator,
};

/// Creates property test configuration based on environment.
///
/// Uses environment variables:
/// - `PROPTEST_CASES`: Number of test cases (default: 20 for dev, 100 for CI)
/// - `CI`: If set to "true", uses CI configuration
fn proptest_config() -> ProptestConfig {
    let is_ci = std::env::var("CI").unwrap_or_default() == "true";
    let default_cases = if is_ci { 100 } else { 20 };

    let cases =
        std::env::var("PROPTEST_CASES").ok().and_then(|s| s.parse().ok()).unwrap_or(default_cases);

    ProptestConfig::with_cases(cases)
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Sign-then-verify round trips for arbitrary digests.
    #[test]
    fn signatures_verify_for_any_digest(digest in prop::array::uniform32(any::<u8>())) {
        let signer = EventSigner::ephemeral();
        let signature = signer.sign_digest(&digest);
        prop_assert!(signer.verify_digest(&digest, &signature).unwrap());
    }

    /// A signature never verifies against a different digest.
    #[test]
    fn signatures_bind_to_their_digest(
        digest in prop::array::uniform32(any::<u8>()),
        other in prop::array::uniform32(any::<u8>()),
    ) {
        prop_assume!(digest != other);
        let signer = EventSigner::ephemeral();
        let signature = signer.sign_digest(&digest);
        prop_assert!(!signer.verify_digest(&other, &signature).unwrap());
    }

    /// Incremental appends and the one-shot MTH agree for any leaf set.
    #[test]
    fn incremental_root_matches_top_down_construction(
        digests in prop::collection::vec(prop::array::uniform32(any::<u8>()), 1..64),
    ) {
        let mut tree = MerkleAccumulator::new();
        for digest in &digests {
            tree.append(digest);
        }
        prop_assert_eq!(tree.root().unwrap(), root_over(&digests).unwrap());
    }

    /// Every inclusion proof verifies against the root it was taken from.
    #[test]
    fn inclusion_proofs_always_verify(
        digests in prop::collection::vec(prop::array::uniform32(any::<u8>()), 1..48),
        index_seed in any::<prop::sample::Index>(),
    ) {
        let mut tree = MerkleAccumulator::new();
        for digest in &digests {
            tree.append(digest);
        }
        let root = tree.root().unwrap();
        let n = digests.len() as u64;
        let i = index_seed.index(digests.len());

        let proof = tree.inclusion_proof(i as u64).unwrap();
        prop_assert!(verify_inclusion(&leaf_hash(&digests[i]), i as u64, n, &proof.path, &root));
    }

    /// A proof never verifies for a leaf it does not cover.
    #[test]
    fn inclusion_proofs_reject_substituted_leaves(
        digests in prop::collection::vec(prop::array::uniform32(any::<u8>()), 2..32),
        substitute in prop::array::uniform32(any::<u8>()),
        index_seed in any::<prop::sample::Index>(),
    ) {
        let i = index_seed.index(digests.len());
        prop_assume!(substitute != digests[i]);

        let mut tree = MerkleAccumulator::new();
        for digest in &digests {
            tree.append(digest);
        }
        let root = tree.root().unwrap();
        let n = digests.len() as u64;
        let proof = tree.inclusion_proof(i as u64).unwrap();

        prop_assert!(!verify_inclusion(&leaf_hash(&substitute), i as u64, n, &proof.path, &root));
    }

    /// Truncating back to a prefix reproduces the prefix tree exactly.
    #[test]
    fn truncate_is_equivalent_to_prefix_construction(
        digests in prop::collection::vec(prop::array::uniform32(any::<u8>()), 2..32),
        cut_seed in any::<prop::sample::Index>(),
    ) {
        let cut = 1 + cut_seed.index(digests.len() - 1);

        let mut tree = MerkleAccumulator::new();
        for digest in &digests {
            tree.append(digest);
        }
        tree.truncate(cut);

        let mut prefix = MerkleAccumulator::new();
        for digest in &digests[..cut] {
            prefix.append(digest);
        }
        prop_assert_eq!(tree.root().unwrap(), prefix.root().unwrap());
    }
}
