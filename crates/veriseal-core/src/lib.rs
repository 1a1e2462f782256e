//! Core domain model for the veriseal evidence pipeline.
//!
//! Provides the canonical JSON serializer, the trading event data model,
//! and the error taxonomy shared by every other crate. Hashing and signing
//! both depend on the byte-exact output of [`canonical`], so changes here
//! affect the verifiability of every sealed event ever written.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod canonical;
pub mod error;
pub mod event;
pub mod time;

pub use canonical::{canonical_digest, canonical_json};
pub use error::{CanonicalError, EventValidationError};
pub use event::{ClockSync, EventRecord, EventType, SealedEvent, Tier, VCP_VERSION};
pub use time::{Clock, RealClock};
