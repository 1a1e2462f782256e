//! Restart replay tests.
//!
//! The accumulator is never persisted; it is rebuilt by replaying the log,
//! and replay must refuse to accept a log whose hashes or chain links fail
//! re-verification.

use std::io::Write as _;

use veriseal_ledger::{EventLog, HashChain, LedgerError};
use veriseal_testing::{order_new, TestEnv};

#[tokio::test]
async fn replay_rebuilds_identical_tree_state() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(5).await.unwrap();
    let before = env.chain.snapshot().await;

    let reopened = env.reopen_chain().unwrap();
    let after = reopened.snapshot().await;

    assert_eq!(before, after);
    assert!(reopened.get_event("E3").await.is_some());
}

#[tokio::test]
async fn replayed_chain_continues_the_link() {
    let env = TestEnv::new().unwrap();
    let sealed = env.seal_batch(2).await.unwrap();

    let reopened = env.reopen_chain().unwrap();
    let next = reopened.append(order_new("E2")).await.unwrap();

    assert_eq!(next.merkle_index, 2);
    assert_eq!(next.prev_hash.as_deref(), Some(sealed[1].event_hash.as_str()));
}

#[tokio::test]
async fn tampered_payload_fails_replay_with_line_number() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(3).await.unwrap();

    // Flip the traded quantity of the second record on disk.
    let contents = std::fs::read_to_string(env.events_path()).unwrap();
    let tampered: String = contents
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 1 { line.replace("0.1", "99.9") } else { line.to_string() })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n";
    std::fs::write(env.events_path(), tampered).unwrap();

    let err = env.reopen_chain().unwrap_err();
    match err.downcast::<LedgerError>().unwrap() {
        LedgerError::CorruptLog { line, reason } => {
            assert_eq!(line, 2);
            assert!(reason.contains("event hash mismatch"), "reason: {reason}");
        },
        other => panic!("expected CorruptLog, got {other}"),
    }
}

#[tokio::test]
async fn truncated_log_with_gap_fails_replay() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(4).await.unwrap();

    // Drop the record at index 1, leaving 0, 2, 3.
    let contents = std::fs::read_to_string(env.events_path()).unwrap();
    let kept: String = contents
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, line)| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n";
    std::fs::write(env.events_path(), kept).unwrap();

    let err = env.reopen_chain().unwrap_err();
    match err.downcast::<LedgerError>().unwrap() {
        LedgerError::CorruptLog { line, .. } => assert_eq!(line, 2),
        other => panic!("expected CorruptLog, got {other}"),
    }
}

#[tokio::test]
async fn trailing_garbage_fails_replay() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(2).await.unwrap();

    std::fs::OpenOptions::new()
        .append(true)
        .open(env.events_path())
        .unwrap()
        .write_all(b"{\"broken\": true}\n")
        .unwrap();

    let err = env.reopen_chain().unwrap_err();
    match err.downcast::<LedgerError>().unwrap() {
        LedgerError::CorruptLog { line, .. } => assert_eq!(line, 3),
        other => panic!("expected CorruptLog, got {other}"),
    }
}

#[tokio::test]
async fn log_lines_are_valid_standalone_json_documents() {
    let env = TestEnv::new().unwrap();
    env.seal_batch(2).await.unwrap();

    let events = EventLog::read_all(&env.events_path()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.event_id, "E0");
}
