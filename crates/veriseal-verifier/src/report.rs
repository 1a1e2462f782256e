//! Structured verification report.
//!
//! The verifier is total: every defect becomes a [`CheckFailure`] naming
//! the event, the check that failed and the expected versus observed
//! values, so an auditor can locate the exact point of tampering.

use std::fmt;

use serde::Serialize;

/// The individual checks the verifier runs, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Recomputed canonical hash matches the stored `event_hash`.
    EventHash,
    /// Signature verifies over the stored digest with the named key.
    Signature,
    /// `merkle_index` values are dense: 0, 1, 2, … with no gaps.
    Sequence,
    /// Each `prev_hash` equals the previous event's `event_hash`.
    PrevHash,
    /// Recomputed Merkle root matches each anchor record.
    MerkleRoot,
    /// Anchor proof blob verifies for its root.
    AnchorProof,
}

impl CheckKind {
    /// Report name of the check.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventHash => "event_hash",
            Self::Signature => "signature",
            Self::Sequence => "sequence",
            Self::PrevHash => "prev_hash",
            Self::MerkleRoot => "merkle_root",
            Self::AnchorProof => "anchor_proof",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One specific verification failure.
#[derive(Debug, Clone, Serialize)]
pub struct CheckFailure {
    /// Identifier of the affected event, when the failure is per-event.
    pub event_id: Option<String>,
    /// Log position of the affected event or anchor.
    pub index: Option<u64>,
    /// Which check failed.
    pub check: CheckKind,
    /// What a correct artifact would have contained.
    pub expected: String,
    /// What was actually found.
    pub observed: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.check)?;
        if let Some(event_id) = &self.event_id {
            write!(f, " event {event_id}")?;
        }
        if let Some(index) = self.index {
            write!(f, " (index {index})")?;
        }
        write!(f, ": expected {}, observed {}", self.expected, self.observed)
    }
}

/// Full result of a verification run.
#[derive(Debug, Serialize)]
pub struct VerificationReport {
    /// Number of sealed events examined.
    pub events_total: usize,
    /// Number of anchor records examined.
    pub anchors_total: usize,
    /// Every failure found, in check order.
    pub failures: Vec<CheckFailure>,
}

impl VerificationReport {
    /// Whether every check passed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures of one specific check.
    pub fn failures_for(&self, check: CheckKind) -> impl Iterator<Item = &CheckFailure> {
        self.failures.iter().filter(move |f| f.check == check)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(70))?;
        writeln!(f, "Evidence Chain Verification Report")?;
        writeln!(f, "{}", "=".repeat(70))?;
        writeln!(f)?;
        writeln!(f, "  Overall Status: {}", if self.passed() { "[PASS]" } else { "[FAIL]" })?;
        writeln!(f, "  Total Events:   {}", self.events_total)?;
        writeln!(f, "  Total Anchors:  {}", self.anchors_total)?;
        writeln!(f, "  Failures:       {}", self.failures.len())?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "[Failures]")?;
            for failure in &self.failures {
                writeln!(f, "  - {failure}")?;
            }
        }

        writeln!(f)?;
        write!(f, "{}", "=".repeat(70))
    }
}
