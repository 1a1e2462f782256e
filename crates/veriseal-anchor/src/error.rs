//! Error types for anchoring operations.

use thiserror::Error;
use veriseal_ledger::LedgerError;

/// Errors raised by anchor providers and the scheduler.
#[derive(Debug, Error)]
pub enum AnchorError {
    /// HTTP transport failure while talking to an external service.
    #[error("anchor transport error: {source}")]
    Http {
        /// Underlying HTTP client error.
        #[from]
        source: reqwest::Error,
    },

    /// Provider returned an unusable response.
    #[error("anchor provider {provider} failed: {reason}")]
    Provider {
        /// Identifier of the failing provider.
        provider: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// Provider call exceeded its configured timeout.
    #[error("anchor provider {provider} timed out after {seconds}s")]
    Timeout {
        /// Identifier of the timed-out provider.
        provider: &'static str,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// Proof blob is malformed or does not match the root.
    #[error("invalid anchor proof: {reason}")]
    InvalidProof {
        /// What failed structurally.
        reason: String,
    },

    /// Proof blob could not be encoded or decoded.
    #[error("anchor proof encoding error: {source}")]
    Encoding {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Persisting or reading anchor records failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AnchorError {
    /// Create a provider error with a custom reason.
    pub fn provider(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::Provider { provider, reason: reason.into() }
    }
}
