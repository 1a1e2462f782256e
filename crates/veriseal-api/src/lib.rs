//! HTTP API server and request handling.
//!
//! Provides the webhook ingestion endpoint, per-event verification and
//! proof queries, the forced-anchor hook and health reporting. Request
//! tracing, timeouts and graceful shutdown follow the service-wide
//! middleware stack in [`server`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod crypto;
pub mod handlers;
pub mod server;

use std::sync::Arc;

use tokio::sync::RwLock;
use veriseal_anchor::{AnchorScheduler, AnchorStatus};
use veriseal_core::{Clock, Tier};
use veriseal_ledger::HashChain;

pub use config::Config;
pub use server::{create_router, start_server};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The seal pipeline's single writer.
    pub chain: Arc<HashChain>,
    /// Anchor scheduler, used directly by the forced-anchor endpoint.
    pub scheduler: Arc<AnchorScheduler>,
    /// Scheduler status mirror for health reporting.
    pub anchor_status: Arc<RwLock<AnchorStatus>>,
    /// Configured compliance tier.
    pub tier: Tier,
    /// Shared secret for webhook HMAC validation, if configured.
    pub webhook_secret: Option<String>,
    /// Clock for timestamps in responses.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Assembles the application state.
    pub fn new(
        chain: Arc<HashChain>,
        scheduler: Arc<AnchorScheduler>,
        tier: Tier,
        webhook_secret: Option<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let anchor_status = scheduler.status_handle();
        Self { chain, scheduler, anchor_status, tier, webhook_secret, clock }
    }
}
