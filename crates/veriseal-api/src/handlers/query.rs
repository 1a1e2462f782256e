//! Per-event verification and inclusion proof queries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use tracing::instrument;
use veriseal_attestation::Side;

use crate::{handlers::error_response, AppState};

/// Response for `GET /vcp/verify/{event_id}`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Whether every check passed.
    pub valid: bool,
    /// Identifier of the verified event.
    pub event_id: String,
    /// Individual check outcomes.
    pub checks: VerifyChecks,
}

/// Per-check outcomes for one event.
#[derive(Debug, Serialize)]
pub struct VerifyChecks {
    /// Recomputed canonical hash matches the stored value.
    pub event_hash: bool,
    /// Signature verifies over the stored digest.
    pub signature: bool,
}

/// Recomputes hash and signature for one sealed event:
/// `GET /vcp/verify/{event_id}`.
#[instrument(name = "verify_event", skip(state))]
pub async fn verify_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Response {
    let Some(sealed) = state.chain.get_event(&event_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no sealed event {event_id}"),
        );
    };

    let hash_valid = sealed
        .recompute_digest()
        .map(|digest| hex::encode(digest) == sealed.event_hash)
        .unwrap_or(false);

    let signature_valid = match (
        hex::decode(&sealed.event_hash).ok().and_then(|d| <[u8; 32]>::try_from(d).ok()),
        BASE64.decode(&sealed.signature).ok(),
    ) {
        (Some(digest), Some(signature)) => state
            .chain
            .verify_signature(&sealed.signer_key_id, &digest, &signature)
            .unwrap_or(false),
        _ => false,
    };

    (
        StatusCode::OK,
        Json(VerifyResponse {
            valid: hash_valid && signature_valid,
            event_id,
            checks: VerifyChecks { event_hash: hash_valid, signature: signature_valid },
        }),
    )
        .into_response()
}

/// Response for `GET /vcp/proof/{event_id}`.
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    /// Identifier of the proven event.
    pub event_id: String,
    /// Zero-based leaf index.
    pub leaf_index: u64,
    /// Tree size the proof was taken against.
    pub tree_size: u64,
    /// Sibling hashes from leaf to root.
    pub audit_path: Vec<AuditPathNode>,
    /// Hex root the proof resolves to.
    pub root: String,
}

/// One audit path element on the wire.
#[derive(Debug, Serialize)]
pub struct AuditPathNode {
    /// Hex sibling hash.
    pub hash: String,
    /// `left` or `right`.
    pub side: Side,
}

/// Returns the Merkle inclusion proof for an event:
/// `GET /vcp/proof/{event_id}`.
#[instrument(name = "get_proof", skip(state))]
pub async fn get_proof(State(state): State<AppState>, Path(event_id): Path<String>) -> Response {
    match state.chain.inclusion_proof_for(&event_id).await {
        Ok(proof) => (
            StatusCode::OK,
            Json(ProofResponse {
                event_id,
                leaf_index: proof.leaf_index,
                tree_size: proof.tree_size,
                audit_path: proof
                    .path
                    .iter()
                    .map(|node| AuditPathNode { hash: hex::encode(node.hash), side: node.side })
                    .collect(),
                root: hex::encode(proof.root),
            }),
        )
            .into_response(),
        Err(veriseal_ledger::LedgerError::UnknownEvent { event_id }) => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no sealed event {event_id}"),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()),
    }
}
