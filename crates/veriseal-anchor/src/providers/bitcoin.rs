//! Bitcoin OP_RETURN anchor provider.
//!
//! Publishes a `VCP1 || root` commitment in an OP_RETURN output through a
//! Bitcoin Core node: create a data-only raw transaction, let the wallet
//! fund and sign it, then broadcast. More expensive than calendar
//! aggregation but confirms independently of any aggregator.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::AnchorError,
    provider::{AnchorProof, AnchorProvider},
    providers::now_utc,
};

/// Protocol tag prefixed to the root inside the OP_RETURN payload.
const COMMITMENT_TAG: &[u8; 4] = b"VCP1";

/// Anchors roots as Bitcoin OP_RETURN commitments.
pub struct BitcoinProvider {
    client: reqwest::Client,
    rpc_url: String,
    rpc_auth: Option<String>,
}

impl BitcoinProvider {
    /// Creates a provider over a Bitcoin Core JSON-RPC endpoint.
    pub fn new(client: reqwest::Client, rpc_url: String, rpc_auth: Option<String>) -> Self {
        Self { client, rpc_url, rpc_auth }
    }

    /// The 36-byte commitment payload carried in the OP_RETURN output.
    fn commitment(root: &[u8; 32]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(36);
        payload.extend_from_slice(COMMITMENT_TAG);
        payload.extend_from_slice(root);
        payload
    }

    /// Script hex of the expected OP_RETURN output: `6a 24 <payload>`.
    fn op_return_script_hex(root: &[u8; 32]) -> String {
        format!("6a24{}", hex::encode(Self::commitment(root)))
    }

    /// Structural offline check: the recorded script is exactly the
    /// OP_RETURN commitment for this root.
    pub fn verify_structure(doc: &Value, root: &[u8; 32]) -> bool {
        doc.get("type").and_then(Value::as_str) == Some("bitcoin_opreturn")
            && doc.get("merkle_root").and_then(Value::as_str) == Some(hex::encode(root).as_str())
            && doc.get("op_return_hex").and_then(Value::as_str)
                == Some(Self::op_return_script_hex(root).as_str())
            && doc.get("txid").and_then(Value::as_str).is_some_and(|t| !t.is_empty())
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, AnchorError> {
        let mut request = self.client.post(&self.rpc_url).json(&json!({
            "jsonrpc": "1.0",
            "id": "veriseal",
            "method": method,
            "params": params,
        }));
        if let Some(auth) = &self.rpc_auth {
            let (user, pass) = auth.split_once(':').unwrap_or((auth.as_str(), ""));
            request = request.basic_auth(user, Some(pass));
        }

        let body: Value = request.send().await?.json().await?;
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(AnchorError::provider("bitcoin", format!("{method} failed: {error}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| AnchorError::provider("bitcoin", format!("{method} returned no result")))
    }
}

#[async_trait]
impl AnchorProvider for BitcoinProvider {
    fn id(&self) -> &'static str {
        "bitcoin"
    }

    async fn submit(&self, root: &[u8; 32]) -> Result<AnchorProof, AnchorError> {
        let data_hex = hex::encode(Self::commitment(root));

        let raw = self
            .rpc_call("createrawtransaction", json!([[], {"data": data_hex}]))
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AnchorError::provider("bitcoin", "createrawtransaction: non-string result"))?;

        let funded = self.rpc_call("fundrawtransaction", json!([raw])).await?;
        let funded_hex = funded
            .get("hex")
            .and_then(Value::as_str)
            .ok_or_else(|| AnchorError::provider("bitcoin", "fundrawtransaction: missing hex"))?;

        let signed = self.rpc_call("signrawtransactionwithwallet", json!([funded_hex])).await?;
        let signed_hex = signed
            .get("hex")
            .and_then(Value::as_str)
            .ok_or_else(|| AnchorError::provider("bitcoin", "signrawtransactionwithwallet: missing hex"))?;

        let txid = self
            .rpc_call("sendrawtransaction", json!([signed_hex]))
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AnchorError::provider("bitcoin", "sendrawtransaction: non-string result"))?;

        info!(txid = %txid, "OP_RETURN commitment broadcast");

        let timestamp = now_utc();
        let blob = json!({
            "type": "bitcoin_opreturn",
            "merkle_root": hex::encode(root),
            "txid": txid,
            "op_return_hex": Self::op_return_script_hex(root),
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
    fn commitment_is_tag_plus_root() {
        let root = [0x42u8; 32];
        let commitment = BitcoinProvider::commitment(&root);
        assert_eq!(commitment.len(), 36);
        assert_eq!(&commitment[..4], b"VCP1");
        assert_eq!(&commitment[4..], &root);
    }

    #[test]
    fn op_return_script_encodes_pushdata() {
        let root = [0x00u8; 32];
        let script = BitcoinProvider::op_return_script_hex(&root);
        // OP_RETURN (0x6a), push 36 bytes (0x24), then the commitment.
        assert!(script.starts_with("6a24"));
        assert_eq!(script.len(), 2 * (2 + 36));
    }

    #[test]
    fn structure_check_binds_script_to_root() {
        let root = [0x77u8; 32];
        let good = json!({
            "type": "bitcoin_opreturn",
            "merkle_root": hex::encode(root),
            "txid": "deadbeef",
            "op_return_hex": BitcoinProvider::op_return_script_hex(&root),
        });
        assert!(BitcoinProvider::verify_structure(&good, &root));

        let other_root = [0x78u8; 32];
        assert!(!BitcoinProvider::verify_structure(&good, &other_root));

        let mut missing_txid = good.clone();
        missing_txid["txid"] = json!("");
        assert!(!BitcoinProvider::verify_structure(&missing_txid, &root));
    }
}
