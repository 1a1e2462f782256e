//! Forced anchoring endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, instrument};
use veriseal_ledger::AnchorRecord;

use crate::{handlers::error_response, AppState};

/// Response for a successfully forced anchor.
#[derive(Debug, Serialize)]
pub struct ForceAnchorResponse {
    /// Always true on the 200 path.
    pub success: bool,
    /// The persisted anchor record.
    pub anchor: AnchorRecord,
}

/// Triggers an immediate anchor: `POST /vcp/anchor/force`.
///
/// Testing and emergency hook; the periodic scheduler is the normal path.
#[instrument(name = "force_anchor", skip(state))]
pub async fn force_anchor(State(state): State<AppState>) -> Response {
    match state.scheduler.anchor_once().await {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(ForceAnchorResponse { success: true, anchor: record }))
                .into_response()
        },
        Ok(None) => error_response(
            StatusCode::BAD_REQUEST,
            "empty_tree",
            "no events to anchor since the last anchor",
        ),
        Err(e) => {
            error!(error = %e, "forced anchor failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
        },
    }
}
