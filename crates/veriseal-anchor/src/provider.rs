//! Anchor provider contract and offline proof verification.
//!
//! A provider turns a 32-byte Merkle root into an opaque proof blob plus a
//! logical timestamp, and can check such a blob later. The blob is stored
//! base64-encoded in the anchor record; its inner structure is a JSON
//! document private to the provider that produced it.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use veriseal_attestation::EventSigner;

use crate::{
    error::AnchorError,
    providers::{
        bitcoin::BitcoinProvider, local::LocalProvider, opentimestamps::OpenTimestampsProvider,
        rfc3161::TsaProvider,
    },
};

/// Proof returned by a successful anchor submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorProof {
    /// Opaque proof bytes; persisted base64-encoded in the anchor record.
    pub blob: Vec<u8>,
    /// ISO-8601 timestamp attested by the provider.
    pub timestamp: String,
}

/// Pluggable anchoring capability.
#[async_trait]
pub trait AnchorProvider: Send + Sync {
    /// Stable identifier recorded in anchor records.
    fn id(&self) -> &'static str;

    /// Submits a Merkle root, returning the proof blob and timestamp.
    async fn submit(&self, root: &[u8; 32]) -> Result<AnchorProof, AnchorError>;

    /// Verifies a previously returned proof blob against a root.
    async fn verify(&self, root: &[u8; 32], blob: &[u8]) -> Result<bool, AnchorError>;
}

/// Recognized anchor provider selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Submit to public OpenTimestamps calendars.
    Opentimestamps,
    /// Publish an OP_RETURN commitment through a Bitcoin Core node.
    Bitcoin,
    /// Request a token from an RFC 3161 time-stamp authority.
    Rfc3161Tsa,
    /// Self-signed statement; dev only, not third-party verifiable.
    Local,
}

impl ProviderKind {
    /// Configuration name of the provider.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opentimestamps => "opentimestamps",
            Self::Bitcoin => "bitcoin",
            Self::Rfc3161Tsa => "rfc3161_tsa",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider connection settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Per-call timeout for provider HTTP requests.
    pub timeout: Duration,
    /// OpenTimestamps calendar base URLs.
    pub calendars: Vec<String>,
    /// RFC 3161 TSA endpoint.
    pub tsa_url: String,
    /// Bitcoin Core JSON-RPC endpoint.
    pub bitcoin_rpc_url: String,
    /// Optional `user:password` for the Bitcoin RPC endpoint.
    pub bitcoin_rpc_auth: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            calendars: vec![
                "https://a.pool.opentimestamps.org".to_string(),
                "https://b.pool.opentimestamps.org".to_string(),
            ],
            tsa_url: "http://timestamp.digicert.com".to_string(),
            bitcoin_rpc_url: "http://127.0.0.1:8332".to_string(),
            bitcoin_rpc_auth: None,
        }
    }
}

/// Constructs the configured provider.
///
/// The signer is only used by the local provider, which signs its own
/// anchor statements.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_provider(
    kind: ProviderKind,
    settings: &ProviderSettings,
    signer: Arc<EventSigner>,
) -> Result<Arc<dyn AnchorProvider>, AnchorError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;

    Ok(match kind {
        ProviderKind::Opentimestamps => {
            Arc::new(OpenTimestampsProvider::new(client, settings.calendars.clone()))
        },
        ProviderKind::Bitcoin => Arc::new(BitcoinProvider::new(
            client,
            settings.bitcoin_rpc_url.clone(),
            settings.bitcoin_rpc_auth.clone(),
        )),
        ProviderKind::Rfc3161Tsa => Arc::new(TsaProvider::new(client, settings.tsa_url.clone())),
        ProviderKind::Local => Arc::new(LocalProvider::new(signer)),
    })
}

/// Verifies a proof blob without network access.
///
/// This is what a third party runs against persisted artifacts, possibly
/// decades later: structural checks for the external providers (the blob
/// commits to exactly this root in the expected shape) and a full
/// signature check for local proofs using the exported public keys.
///
/// # Errors
///
/// Returns `AnchorError::Encoding` for an undecodable blob; structural
/// mismatches report as `Ok(false)`.
pub fn verify_offline(
    provider: &str,
    root: &[u8; 32],
    blob: &[u8],
    keys: &HashMap<String, VerifyingKey>,
) -> Result<bool, AnchorError> {
    let doc: serde_json::Value = serde_json::from_slice(blob)?;

    match provider {
        "local" => LocalProvider::verify_statement(&doc, root, keys),
        "opentimestamps" => Ok(OpenTimestampsProvider::verify_structure(&doc, root)),
        "bitcoin" => Ok(BitcoinProvider::verify_structure(&doc, root)),
        "rfc3161_tsa" => Ok(TsaProvider::verify_structure(&doc, root)),
        other => Err(AnchorError::InvalidProof { reason: format!("unknown provider {other:?}") }),
    }
}
