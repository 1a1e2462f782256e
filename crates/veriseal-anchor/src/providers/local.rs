//! Local self-signed anchor provider.
//!
//! Signs a statement over the root with the pipeline's own Ed25519 key.
//! Useful for development and testing only: the statement proves nothing
//! to a third party, since the signer attests to itself.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::VerifyingKey;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use veriseal_attestation::{verify_with_key, EventSigner};

use crate::{
    error::AnchorError,
    provider::{AnchorProof, AnchorProvider},
    providers::now_utc,
};

/// Domain prefix keeping anchor-statement digests apart from event digests.
const STATEMENT_DOMAIN: &[u8] = b"veriseal.anchor.local.v1";

/// Self-signed anchor statements; dev only.
pub struct LocalProvider {
    signer: Arc<EventSigner>,
}

impl LocalProvider {
    /// Creates a local provider signing with the pipeline key.
    pub fn new(signer: Arc<EventSigner>) -> Self {
        Self { signer }
    }

    /// Digest of the signed statement: domain || root || timestamp.
    fn statement_digest(root: &[u8; 32], anchored_at: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(STATEMENT_DOMAIN);
        hasher.update(root);
        hasher.update(anchored_at.as_bytes());
        hasher.finalize().into()
    }

    /// Verifies a parsed local statement against a root and key set.
    ///
    /// # Errors
    ///
    /// Returns `AnchorError::InvalidProof` for a statement missing its
    /// required fields; signature mismatches report as `Ok(false)`.
    pub fn verify_statement(
        doc: &Value,
        root: &[u8; 32],
        keys: &HashMap<String, VerifyingKey>,
    ) -> Result<bool, AnchorError> {
        let field = |name: &str| {
            doc.get(name).and_then(Value::as_str).ok_or_else(|| AnchorError::InvalidProof {
                reason: format!("local statement missing field {name:?}"),
            })
        };

        if field("type")? != "local" {
            return Ok(false);
        }
        if field("merkle_root")? != hex::encode(root) {
            return Ok(false);
        }

        let anchored_at = field("anchored_at")?;
        let key_id = field("key_id")?;
        let signature = BASE64
            .decode(field("signature")?)
            .map_err(|e| AnchorError::InvalidProof { reason: format!("bad signature base64: {e}") })?;

        let Some(key) = keys.get(key_id) else {
            return Ok(false);
        };

        let digest = Self::statement_digest(root, anchored_at);
        verify_with_key(key, &digest, &signature)
            .map_err(|e| AnchorError::InvalidProof { reason: e.to_string() })
    }
}

#[async_trait]
impl AnchorProvider for LocalProvider {
    fn id(&self) -> &'static str {
        "local"
    }

    async fn submit(&self, root: &[u8; 32]) -> Result<AnchorProof, AnchorError> {
        let anchored_at = now_utc();
        let digest = Self::statement_digest(root, &anchored_at);
        let signature = self.signer.sign_digest(&digest);

        let statement = json!({
            "type": "local",
            "merkle_root": hex::encode(root),
            "anchored_at": anchored_at,
            "key_id": self.signer.key_id(),
            "signature": BASE64.encode(signature),
        });

        Ok(AnchorProof { blob: serde_json::to_vec(&statement)?, timestamp: anchored_at })
    }

    async fn verify(&self, root: &[u8; 32], blob: &[u8]) -> Result<bool, AnchorError> {
        let doc: Value = serde_json::from_slice(blob)?;
        let mut keys = HashMap::new();
        keys.insert(self.signer.key_id().to_string(), *self.signer.verifying_key());
        Self::verify_statement(&doc, root, &keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> LocalProvider {
        LocalProvider::new(Arc::new(EventSigner::ephemeral()))
    }

    #[tokio::test]
    async fn statement_round_trips() {
        let provider = provider();
        let root = [0x11u8; 32];

        let proof = provider.submit(&root).await.unwrap();
        assert!(provider.verify(&root, &proof.blob).await.unwrap());
    }

    #[tokio::test]
    async fn statement_binds_to_its_root() {
        let provider = provider();
        let proof = provider.submit(&[0x11u8; 32]).await.unwrap();

        assert!(!provider.verify(&[0x22u8; 32], &proof.blob).await.unwrap());
    }

    #[tokio::test]
    async fn statement_rejects_foreign_key() {
        let root = [0x33u8; 32];
        let proof = provider().submit(&root).await.unwrap();

        // A provider holding a different key cannot verify the statement.
        let other = provider();
        assert!(!other.verify(&root, &proof.blob).await.unwrap());
    }

    #[tokio::test]
    async fn tampered_statement_fails() {
        let provider = provider();
        let root = [0x44u8; 32];
        let proof = provider.submit(&root).await.unwrap();

        let mut doc: Value = serde_json::from_slice(&proof.blob).unwrap();
        doc["anchored_at"] = json!("1999-01-01T00:00:00.000Z");
        let tampered = serde_json::to_vec(&doc).unwrap();

        assert!(!provider.verify(&root, &tampered).await.unwrap());
    }

    #[tokio::test]
    async fn truncated_statement_is_invalid_proof() {
        let provider = provider();
        let result = provider.verify(&[0u8; 32], br#"{"type":"local"}"#).await;
        assert!(matches!(result, Err(AnchorError::InvalidProof { .. })));
    }
}
