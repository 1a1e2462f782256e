//! OpenTimestamps calendar provider.
//!
//! Submits the root digest to public calendar servers, which aggregate
//! digests and commit them to Bitcoin. The proof blob records each
//! calendar's pending attestation; upgrading a pending attestation to a
//! Bitcoin-confirmed one is an OpenTimestamps client concern outside this
//! pipeline.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    error::AnchorError,
    provider::{AnchorProof, AnchorProvider},
    providers::now_utc,
};

/// Anchors roots to OpenTimestamps calendar servers.
pub struct OpenTimestampsProvider {
    client: reqwest::Client,
    calendars: Vec<String>,
}

impl OpenTimestampsProvider {
    /// Creates a provider over the given calendar pool.
    pub fn new(client: reqwest::Client, calendars: Vec<String>) -> Self {
        Self { client, calendars }
    }

    /// Structural offline check: the blob commits to exactly this root and
    /// carries at least one calendar response.
    pub fn verify_structure(doc: &Value, root: &[u8; 32]) -> bool {
        doc.get("type").and_then(Value::as_str) == Some("opentimestamps")
            && doc.get("merkle_root").and_then(Value::as_str) == Some(hex::encode(root).as_str())
            && doc
                .get("responses")
                .and_then(Value::as_array)
                .is_some_and(|r| r.iter().any(|v| v.as_str().is_some_and(|s| !s.is_empty())))
    }
}

#[async_trait]
impl AnchorProvider for OpenTimestampsProvider {
    fn id(&self) -> &'static str {
        "opentimestamps"
    }

    async fn submit(&self, root: &[u8; 32]) -> Result<AnchorProof, AnchorError> {
        let mut calendars = Vec::new();
        let mut responses = Vec::new();

        for calendar in &self.calendars {
            let url = format!("{}/digest", calendar.trim_end_matches('/'));
            match self.client.post(&url).body(root.to_vec()).send().await {
                Ok(response) if response.status().is_success() => {
                    let body = response.bytes().await?;
                    debug!(calendar = %calendar, bytes = body.len(), "calendar accepted digest");
                    calendars.push(calendar.clone());
                    responses.push(BASE64.encode(&body));
                },
                Ok(response) => {
                    warn!(calendar = %calendar, status = %response.status(), "calendar rejected digest");
                },
                Err(e) => {
                    warn!(calendar = %calendar, error = %e, "calendar unreachable");
                },
            }
        }

        if responses.is_empty() {
            return Err(AnchorError::provider(self.id(), "no calendar accepted the digest"));
        }

        let timestamp = now_utc();
        let blob = json!({
            "type": "opentimestamps",
            "merkle_root": hex::encode(root),
            "submitted_at": timestamp,
            "calendars": calendars,
            "responses": responses,
        });

        Ok(AnchorProof { blob: serde_json::to_vec(&blob)?, timestamp })
    }

    async fn verify(&self, root: &[u8; 32], blob: &[u8]) -> Result<bool, AnchorError> {
        let doc: Value = serde_json::from_slice(blob)?;
        Ok(Self::verify_structure(&doc, root))
    }
}
