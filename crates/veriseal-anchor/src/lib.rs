//! External anchoring for Merkle tree roots.
//!
//! Periodically commits the accumulator root to an external timestamping
//! service so that a third party can bound when the covered events
//! existed. Providers are pluggable behind [`provider::AnchorProvider`];
//! ingestion is never blocked by anchor failures.

#![warn(missing_docs)]

pub mod error;
pub mod provider;
pub mod providers;
pub mod scheduler;

pub use error::AnchorError;
pub use provider::{
    build_provider, verify_offline, AnchorProof, AnchorProvider, ProviderKind, ProviderSettings,
};
pub use scheduler::{AnchorScheduler, AnchorStatus};
