//! Error types for log persistence and chain operations.

use thiserror::Error;
use veriseal_attestation::AttestationError;
use veriseal_core::{CanonicalError, EventValidationError};

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised by the event log, anchor store and hash chain.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Disk I/O failed.
    #[error("ledger I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A persisted line could not be parsed or failed replay verification.
    ///
    /// Raised during startup replay; the process must not accept writes
    /// over a log that fails verification.
    #[error("corrupt event log at line {line}: {reason}")]
    CorruptLog {
        /// One-based line number of the first bad record.
        line: usize,
        /// What failed at that line.
        reason: String,
    },

    /// JSON serialization of a record failed.
    #[error("ledger serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Inbound event failed schema validation.
    #[error("invalid event: {source}")]
    InvalidEvent {
        /// Underlying validation error.
        #[from]
        source: EventValidationError,
    },

    /// Event payload could not be canonicalized.
    #[error("canonicalization failed: {source}")]
    Canonical {
        /// Underlying canonicalization error.
        #[from]
        source: CanonicalError,
    },

    /// Signing or Merkle operation failed.
    #[error(transparent)]
    Attestation(#[from] AttestationError),

    /// No sealed event exists with the given identifier.
    #[error("unknown event {event_id}")]
    UnknownEvent {
        /// The identifier that was looked up.
        event_id: String,
    },
}

impl LedgerError {
    /// Whether this error was caused by the client's input.
    ///
    /// Client errors map to HTTP 400 at the webhook boundary; everything
    /// else is a server-side failure.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidEvent { .. } | Self::Canonical { .. })
    }
}
