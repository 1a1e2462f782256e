//! Integration tests for the hash chain critical section.
//!
//! Exercises sealing through the public chain API with real on-disk logs:
//! chain linking, dense indexing, signature encoding and concurrent
//! submission ordering.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use veriseal_attestation::{leaf_hash, node_hash, verify_inclusion};
use veriseal_testing::{order_new, EventBuilder, TestEnv};

#[tokio::test]
async fn first_event_has_no_prev_hash_and_index_zero() {
    let env = TestEnv::new().unwrap();

    let sealed = env.chain.append(order_new("E0")).await.unwrap();

    assert_eq!(sealed.merkle_index, 0);
    assert!(sealed.prev_hash.is_none());
    assert_eq!(sealed.signer_key_id, env.signer.key_id());
}

#[tokio::test]
async fn event_hash_matches_canonical_subset_digest() {
    let env = TestEnv::new().unwrap();

    let sealed = env.chain.append(order_new("E0")).await.unwrap();

    let digest = sealed.recompute_digest().unwrap();
    assert_eq!(sealed.event_hash, hex::encode(digest));
}

#[tokio::test]
async fn signature_covers_raw_digest_bytes() {
    let env = TestEnv::new().unwrap();

    let sealed = env.chain.append(order_new("E0")).await.unwrap();

    let digest: [u8; 32] =
        hex::decode(&sealed.event_hash).unwrap().try_into().expect("32-byte digest");
    let signature = BASE64.decode(&sealed.signature).unwrap();
    assert!(env.signer.verify_digest(&digest, &signature).unwrap());
}

#[tokio::test]
async fn sequential_events_link_by_prev_hash() {
    let env = TestEnv::new().unwrap();

    let sealed = env.seal_batch(3).await.unwrap();

    assert_eq!(sealed[1].prev_hash.as_deref(), Some(sealed[0].event_hash.as_str()));
    assert_eq!(sealed[2].prev_hash.as_deref(), Some(sealed[1].event_hash.as_str()));
    assert_eq!(
        sealed.iter().map(|s| s.merkle_index).collect::<Vec<_>>(),
        vec![0, 1, 2],
        "indices are dense"
    );
}

#[tokio::test]
async fn single_event_root_is_leaf_of_its_digest() {
    let env = TestEnv::new().unwrap();

    let sealed = env.chain.append(order_new("E0")).await.unwrap();
    let digest: [u8; 32] = hex::decode(&sealed.event_hash).unwrap().try_into().unwrap();

    let snapshot = env.chain.snapshot().await;
    assert_eq!(snapshot.size, 1);
    assert_eq!(snapshot.root, Some(leaf_hash(&digest)));
}

#[tokio::test]
async fn two_event_root_and_proof_follow_rfc6962() {
    let env = TestEnv::new().unwrap();

    let sealed = env.seal_batch(2).await.unwrap();
    let d0: [u8; 32] = hex::decode(&sealed[0].event_hash).unwrap().try_into().unwrap();
    let d1: [u8; 32] = hex::decode(&sealed[1].event_hash).unwrap().try_into().unwrap();

    let snapshot = env.chain.snapshot().await;
    assert_eq!(snapshot.root, Some(node_hash(&leaf_hash(&d0), &leaf_hash(&d1))));

    let proof = env.chain.inclusion_proof_for("E0").await.unwrap();
    assert_eq!(proof.leaf_index, 0);
    assert_eq!(proof.tree_size, 2);
    assert_eq!(proof.path.len(), 1);
    assert_eq!(proof.path[0].hash, leaf_hash(&d1));
    assert!(verify_inclusion(&leaf_hash(&d0), 0, 2, &proof.path, &proof.root));
}

#[tokio::test]
async fn inclusion_proof_verifies_for_middle_event() {
    let env = TestEnv::new().unwrap();

    let sealed = env.seal_batch(3).await.unwrap();
    let d1: [u8; 32] = hex::decode(&sealed[1].event_hash).unwrap().try_into().unwrap();

    let proof = env.chain.inclusion_proof_for("E1").await.unwrap();
    assert!(verify_inclusion(&leaf_hash(&d1), 1, 3, &proof.path, &proof.root));
}

#[tokio::test]
async fn unknown_event_proof_is_an_error() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(1).await.unwrap();

    let err = env.chain.inclusion_proof_for("nope").await.unwrap_err();
    assert!(matches!(err, veriseal_ledger::LedgerError::UnknownEvent { .. }));
}

#[tokio::test]
async fn invalid_event_is_rejected_without_side_effects() {
    let env = TestEnv::new().unwrap();

    let bad = EventBuilder::new("E0").timestamp("yesterday").build();
    let err = env.chain.append(bad).await.unwrap_err();
    assert!(err.is_client_error());

    assert_eq!(env.chain.len().await, 0);
    assert!(!env.events_path().exists() || {
        let contents = std::fs::read_to_string(env.events_path()).unwrap();
        contents.trim().is_empty()
    });
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_consecutive_indices() {
    let env = TestEnv::new().unwrap();

    let chain_a = env.chain.clone();
    let chain_b = env.chain.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { chain_a.append(order_new("A")).await }),
        tokio::spawn(async move { chain_b.append(order_new("B")).await }),
    );
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    let mut indices = vec![a.merkle_index, b.merkle_index];
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1]);

    // Whichever ordered second links to whichever ordered first.
    let (first, second) = if a.merkle_index == 0 { (&a, &b) } else { (&b, &a) };
    assert!(first.prev_hash.is_none());
    assert_eq!(second.prev_hash.as_deref(), Some(first.event_hash.as_str()));
}

#[tokio::test]
async fn payload_key_order_does_not_change_event_hash() {
    let env_a = TestEnv::new().unwrap();
    let env_b = TestEnv::new().unwrap();

    let a: serde_json::Value =
        serde_json::from_str(r#"{"qty":0.1,"side":"BUY","symbol":"BTCUSD"}"#).unwrap();
    let b: serde_json::Value =
        serde_json::from_str(r#"{"symbol":"BTCUSD","side":"BUY","qty":0.1}"#).unwrap();

    let sealed_a = env_a.chain.append(EventBuilder::new("E0").payload(a).build()).await.unwrap();
    let sealed_b = env_b.chain.append(EventBuilder::new("E0").payload(b).build()).await.unwrap();

    assert_eq!(sealed_a.event_hash, sealed_b.event_hash);
}
