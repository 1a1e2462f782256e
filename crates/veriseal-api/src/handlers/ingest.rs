//! Webhook ingestion handler.
//!
//! Accepts a trading event, validates its schema and (when configured)
//! its HMAC signature, then runs it through the seal pipeline. Schema and
//! canonicalization problems are client errors and never touch the log;
//! signing and persistence problems are server errors that leave the
//! chain state unchanged.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, instrument, warn};
use veriseal_core::EventRecord;
use veriseal_ledger::LedgerError;

use crate::{crypto, handlers::error_response, AppState};

/// Header carrying the HMAC-SHA256 of the request body.
const SIGNATURE_HEADER: &str = "x-vcp-signature";

/// Response from successful event ingestion.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Always true on the 200 path.
    pub success: bool,
    /// Identifier of the sealed event.
    pub event_id: String,
    /// Hex digest of the canonical event form.
    pub event_hash: String,
    /// Base64 Ed25519 signature over the digest.
    pub signature: String,
    /// Position assigned in the log and Merkle tree.
    pub merkle_index: u64,
}

/// Ingests one trading event: `POST /vcp/event`.
#[instrument(name = "receive_event", skip(state, headers, body))]
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        let signature =
            headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
        let validation = crypto::validate_signature(&body, signature, secret);
        if !validation.is_valid {
            warn!(
                reason = validation.error_message.as_deref().unwrap_or("unknown"),
                "webhook signature rejected"
            );
            return error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "webhook signature validation failed",
            );
        }
    }

    let event: EventRecord = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "event failed schema parsing");
            return error_response(StatusCode::BAD_REQUEST, "schema", e.to_string());
        },
    };

    match state.chain.append(event).await {
        Ok(sealed) => {
            info!(
                event_id = %sealed.event.event_id,
                merkle_index = sealed.merkle_index,
                "event sealed"
            );
            (
                StatusCode::OK,
                Json(IngestResponse {
                    success: true,
                    event_id: sealed.event.event_id.clone(),
                    event_hash: sealed.event_hash.clone(),
                    signature: sealed.signature.clone(),
                    merkle_index: sealed.merkle_index,
                }),
            )
                .into_response()
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "event rejected");
            let code = match e {
                LedgerError::Canonical { .. } => "canonicalization",
                _ => "schema",
            };
            error_response(StatusCode::BAD_REQUEST, code, e.to_string())
        },
        Err(e) => {
            tracing::error!(error = %e, "sealing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        },
    }
}
