//! Error types for signing and Merkle tree operations.

/// Errors that can occur during attestation operations.
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    /// Ed25519 signature bytes are malformed.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Key file missing, unreadable, or not a valid Ed25519 key.
    #[error("invalid key material: {message}")]
    InvalidKeyFormat {
        /// Detailed error message explaining the format issue.
        message: String,
    },

    /// Requested a root or proof from a tree with no leaves.
    #[error("merkle tree is empty")]
    EmptyTree,

    /// Leaf index is outside the current tree.
    #[error("leaf index {index} out of bounds for tree of size {tree_size}")]
    IndexOutOfBounds {
        /// The requested leaf index.
        index: u64,
        /// Number of leaves in the tree.
        tree_size: u64,
    },

    /// Public key export document is malformed.
    #[error("invalid public key export: {source}")]
    InvalidExport {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Reading or writing key material failed.
    #[error("key I/O error: {source}")]
    KeyIo {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl AttestationError {
    /// Create an invalid key format error with a custom message.
    pub fn invalid_key_format(message: impl Into<String>) -> Self {
        Self::InvalidKeyFormat { message: message.into() }
    }
}

/// Result type alias for attestation operations.
pub type Result<T> = std::result::Result<T, AttestationError>;
