//! Append-only persistence and the seal pipeline's critical section.
//!
//! Owns the event log writer, the hash chain state, and the anchor record
//! store. The [`chain::HashChain`] append is the linearization point of
//! the whole pipeline: `prev_hash` linking, dense `merkle_index`
//! assignment and Merkle accumulation happen atomically under one lock.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anchors;
pub mod chain;
pub mod error;
pub mod log;

pub use anchors::{AnchorRecord, AnchorStore};
pub use chain::{HashChain, TreeSnapshot};
pub use error::{LedgerError, Result};
pub use log::EventLog;
