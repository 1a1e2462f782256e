//! RFC 3161 time-stamp authority provider.
//!
//! Builds a DER-encoded `TimeStampReq` over the root digest and posts it
//! to a TSA endpoint. The returned token is stored opaquely; full token
//! chain validation is a PKI concern left to external tooling, so offline
//! verification checks that the token exists and the request imprint
//! matches the root.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::AnchorError,
    provider::{AnchorProof, AnchorProvider},
    providers::now_utc,
};

/// Anchors roots via an RFC 3161 time-stamp authority.
pub struct TsaProvider {
    client: reqwest::Client,
    tsa_url: String,
}

impl TsaProvider {
    /// Creates a provider for the given TSA endpoint.
    pub fn new(client: reqwest::Client, tsa_url: String) -> Self {
        Self { client, tsa_url }
    }

    /// Structural offline check: imprint matches the root and a token is
    /// present.
    pub fn verify_structure(doc: &Value, root: &[u8; 32]) -> bool {
        doc.get("type").and_then(Value::as_str) == Some("rfc3161")
            && doc.get("hash_algorithm").and_then(Value::as_str) == Some("sha256")
            && doc.get("message_imprint").and_then(Value::as_str)
                == Some(hex::encode(root).as_str())
            && doc.get("token").and_then(Value::as_str).is_some_and(|t| !t.is_empty())
    }

    /// DER-encodes a minimal `TimeStampReq` for a SHA-256 imprint.
    ///
    /// ```text
    /// TimeStampReq ::= SEQUENCE {
    ///     version        INTEGER 1,
    ///     messageImprint SEQUENCE {
    ///         hashAlgorithm  AlgorithmIdentifier (sha256, NULL params),
    ///         hashedMessage  OCTET STRING (32 bytes) },
    ///     certReq        BOOLEAN TRUE }
    /// ```
    fn build_request(digest: &[u8; 32]) -> Vec<u8> {
        // OID 2.16.840.1.101.3.4.2.1 (sha256)
        const SHA256_OID: [u8; 11] = [0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

        let mut algorithm = Vec::new();
        algorithm.extend_from_slice(&SHA256_OID);
        algorithm.extend_from_slice(&[0x05, 0x00]); // NULL params
        let algorithm = der_sequence(&algorithm);

        let mut imprint = algorithm;
        imprint.push(0x04); // OCTET STRING
        imprint.push(32);
        imprint.extend_from_slice(digest);
        let imprint = der_sequence(&imprint);

        let mut body = vec![0x02, 0x01, 0x01]; // INTEGER 1
        body.extend_from_slice(&imprint);
        body.extend_from_slice(&[0x01, 0x01, 0xff]); // BOOLEAN TRUE
        der_sequence(&body)
    }
}

/// Wraps DER content in a SEQUENCE header; content must stay under 256
/// bytes, which holds for the fixed-size request built here.
fn der_sequence(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 3);
    out.push(0x30);
    if content.len() < 128 {
        out.push(content.len() as u8);
    } else {
        out.push(0x81);
        out.push(content.len() as u8);
    }
    out.extend_from_slice(content);
    out
}

#[async_trait]
impl AnchorProvider for TsaProvider {
    fn id(&self) -> &'static str {
        "rfc3161_tsa"
    }

    async fn submit(&self, root: &[u8; 32]) -> Result<AnchorProof, AnchorError> {
        let request = Self::build_request(root);

        let response = self
            .client
            .post(&self.tsa_url)
            .header("content-type", "application/timestamp-query")
            .body(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnchorError::provider(
                self.id(),
                format!("TSA returned status {}", response.status()),
            ));
        }

        let token = response.bytes().await?;
        if token.is_empty() {
            return Err(AnchorError::provider(self.id(), "TSA returned an empty token"));
        }
        debug!(tsa = %self.tsa_url, token_bytes = token.len(), "timestamp token received");

        let timestamp = now_utc();
        let blob = json!({
            "type": "rfc3161",
            "tsa_url": self.tsa_url,
            "hash_algorithm": "sha256",
            "message_imprint": hex::encode(root),
            "token": BASE64.encode(&token),
            "anchored_at": timestamp,
        });

        Ok(AnchorProof { blob: serde_json::to_vec(&blob)?, timestamp })
    }

    async fn verify(&self, root: &[u8; 32], blob: &[u8]) -> Result<bool, AnchorError> {
        let doc: Value = serde_json::from_slice(blob)?;
        Ok(Self::verify_structure(&doc, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_request_has_expected_der_layout() {
        let digest = [0xabu8; 32];
        let request = TsaProvider::build_request(&digest);

        // Outer SEQUENCE wrapping version, imprint and certReq.
        assert_eq!(request[0], 0x30);
        assert_eq!(request[1] as usize, request.len() - 2);
        // version INTEGER 1
        assert_eq!(&request[2..5], &[0x02, 0x01, 0x01]);
        // The digest appears verbatim inside the imprint.
        assert!(request.windows(32).any(|w| w == digest));
        // certReq BOOLEAN TRUE is the trailer.
        assert_eq!(&request[request.len() - 3..], &[0x01, 0x01, 0xff]);
    }

    #[test]
    fn der_request_is_deterministic() {
        let digest = [0x01u8; 32];
        assert_eq!(TsaProvider::build_request(&digest), TsaProvider::build_request(&digest));
    }

    #[test]
    fn structure_check_requires_imprint_and_token() {
        let root = [0x5au8; 32];
        let good = json!({
            "type": "rfc3161",
            "hash_algorithm": "sha256",
            "message_imprint": hex::encode(root),
            "token": "dG9rZW4=",
        });
        assert!(TsaProvider::verify_structure(&good, &root));

        let mut empty_token = good.clone();
        empty_token["token"] = json!("");
        assert!(!TsaProvider::verify_structure(&empty_token, &root));

        assert!(!TsaProvider::verify_structure(&good, &[0x5bu8; 32]));
    }
}
