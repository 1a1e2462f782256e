//! Ed25519 digest signing and verification.
//!
//! The signer owns the long-lived key pair and exposes exactly one signing
//! surface: a detached signature over a raw 32-byte digest. The key never
//! leaves this module; callers see only the public key export and the
//! stable key identifier.

use std::path::Path;

use ed25519_dalek::{
    pkcs8::DecodePrivateKey, Signature, Signer, SigningKey, Verifier, VerifyingKey,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AttestationError, Result};

/// Ed25519 signing service for the evidence pipeline.
///
/// Holds the private key for the lifetime of the process. Signing is
/// deterministic: the same digest always yields the same signature.
pub struct EventSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    key_id: String,
}

impl std::fmt::Debug for EventSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The private key is deliberately absent from debug output.
        f.debug_struct("EventSigner").field("key_id", &self.key_id).finish()
    }
}

impl EventSigner {
    /// Creates an ephemeral signer with a fresh random key pair.
    ///
    /// Suitable for tests and development; production keys are loaded from
    /// PEM files written by the keygen tool.
    pub fn ephemeral() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Creates a signer from raw Ed25519 private key bytes.
    pub fn from_bytes(private_key_bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(private_key_bytes))
    }

    /// Loads the signer from a PKCS#8 PEM private key file.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::InvalidKeyFormat` if the file is missing,
    /// unreadable, or not a valid Ed25519 PKCS#8 document. Callers treat
    /// this as fatal at startup: the pipeline must not accept events
    /// without a ready signer.
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let signing_key = SigningKey::read_pkcs8_pem_file(path).map_err(|e| {
            AttestationError::invalid_key_format(format!(
                "cannot load private key from {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let key_id = compute_key_id(&verifying_key);
        Self { signing_key, verifying_key, key_id }
    }

    /// Signs a raw 32-byte digest, returning the 64-byte signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; 64] {
        self.signing_key.sign(digest).to_bytes()
    }

    /// Verifies a signature over a digest against this signer's public key.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::InvalidSignature` if the signature bytes
    /// are not a well-formed Ed25519 signature.
    pub fn verify_digest(&self, digest: &[u8; 32], signature_bytes: &[u8]) -> Result<bool> {
        verify_with_key(&self.verifying_key, digest, signature_bytes)
    }

    /// Returns the stable key identifier: hex SHA-256 of the public key.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the Ed25519 public key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Returns the public key in canonical 32-byte form.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Builds the public key export document for this signer.
    pub fn export(&self) -> PublicKeyExport {
        PublicKeyExport {
            key_id: self.key_id.clone(),
            algorithm: "ed25519".to_string(),
            public_key: hex::encode(self.public_key_bytes()),
        }
    }
}

/// Verifies a signature over a digest with an arbitrary public key.
///
/// Used by the offline verifier, which selects keys by `signer_key_id`
/// from a set of exports rather than holding a signer.
///
/// # Errors
///
/// Returns `AttestationError::InvalidSignature` if the signature bytes are
/// not a well-formed Ed25519 signature.
pub fn verify_with_key(
    key: &VerifyingKey,
    digest: &[u8; 32],
    signature_bytes: &[u8],
) -> Result<bool> {
    let signature =
        Signature::from_slice(signature_bytes).map_err(|_| AttestationError::InvalidSignature)?;
    Ok(key.verify(digest, &signature).is_ok())
}

/// Computes the stable key identifier from a public key.
fn compute_key_id(verifying_key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(verifying_key.to_bytes()))
}

/// Persisted public key export.
///
/// One JSON document per key, consumed by the offline verifier to build
/// its key set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyExport {
    /// Hex SHA-256 of the public key bytes.
    pub key_id: String,
    /// Signature algorithm; always "ed25519".
    pub algorithm: String,
    /// Hex-encoded public key bytes.
    pub public_key: String,
}

impl PublicKeyExport {
    /// Reads an export document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes the export document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reconstructs the Ed25519 verifying key from the export.
    ///
    /// # Errors
    ///
    /// Returns `AttestationError::InvalidKeyFormat` if the algorithm is not
    /// ed25519 or the key bytes are malformed.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        if self.algorithm != "ed25519" {
            return Err(AttestationError::invalid_key_format(format!(
                "unsupported algorithm {:?}",
                self.algorithm
            )));
        }
        let bytes = hex::decode(&self.public_key)
            .map_err(|e| AttestationError::invalid_key_format(format!("bad public key hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AttestationError::invalid_key_format("public key must be 32 bytes"))?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| AttestationError::invalid_key_format(format!("bad public key: {e}")))
    }
}
