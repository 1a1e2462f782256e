//! Health check handler.
//!
//! Called frequently by orchestration systems; reads only in-memory state
//! plus the chain length under its lock.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Timestamp when the health check was performed.
    pub timestamp: DateTime<Utc>,
    /// Service version.
    pub version: String,
    /// Configured compliance tier.
    pub tier: String,
    /// Whether the signer is loaded and ready.
    pub signer_ready: bool,
    /// Events sealed but not yet covered by an anchor.
    pub events_pending: u64,
    /// Timestamp of the most recent successful anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_anchor_at: Option<String>,
    /// Most recent anchor submission error, if the scheduler is retrying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_anchor_error: Option<String>,
}

/// Service health: `GET /health`.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let sealed = state.chain.len().await;
    let anchor_status = state.anchor_status.read().await.clone();

    let status = if anchor_status.last_error.is_some() { "degraded" } else { "healthy" };

    let response = HealthResponse {
        status,
        timestamp: DateTime::<Utc>::from(state.clock.now_system()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tier: state.tier.to_string(),
        signer_ready: true,
        events_pending: sealed.saturating_sub(anchor_status.last_anchor_count),
        last_anchor_at: anchor_status.last_anchor_at,
        last_anchor_error: anchor_status.last_error,
    };

    (StatusCode::OK, Json(response)).into_response()
}
