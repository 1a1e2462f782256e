//! Test infrastructure for the veriseal workspace.
//!
//! Provides an isolated on-disk environment per test (temp data directory,
//! ephemeral signer, ready-to-use hash chain) and deterministic event
//! fixture builders. Ensures reproducible test execution with proper
//! resource cleanup.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod env;
pub mod events;

pub use env::TestEnv;
pub use events::{order_new, EventBuilder};
