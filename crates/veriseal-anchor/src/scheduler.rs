//! Periodic anchoring of the accumulator root.
//!
//! On each tick the scheduler snapshots `(size, root)` under the chain
//! lock, hands the root to the configured provider outside the lock, and
//! appends an anchor record. Provider failures never block ingestion:
//! submission is retried with exponential backoff (base 1s, cap 10min,
//! unbounded) and the last error is surfaced through the health endpoint.

use std::{sync::Arc, time::Duration};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use veriseal_core::Clock;
use veriseal_ledger::{AnchorRecord, AnchorStore, HashChain};

use crate::{error::AnchorError, provider::AnchorProvider};

/// Base delay for submission retries.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Cap on the retry backoff.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(600);

/// Observable state of the scheduler, exposed via `/health`.
#[derive(Debug, Clone, Default)]
pub struct AnchorStatus {
    /// Timestamp of the most recent successful anchor.
    pub last_anchor_at: Option<String>,
    /// `anchored_count` of the most recent successful anchor.
    pub last_anchor_count: u64,
    /// Most recent provider error, cleared on success.
    pub last_error: Option<String>,
}

/// Periodic anchor task over one provider.
pub struct AnchorScheduler {
    chain: Arc<HashChain>,
    provider: Arc<dyn AnchorProvider>,
    store: AnchorStore,
    clock: Arc<dyn Clock>,
    interval: Duration,
    provider_timeout: Duration,
    status: Arc<RwLock<AnchorStatus>>,
    /// Serializes anchor attempts: the periodic loop and the forced-anchor
    /// endpoint share this scheduler, and the last-record read and the
    /// record append must not interleave across a provider call.
    anchor_gate: Mutex<()>,
}

impl AnchorScheduler {
    /// Creates a scheduler; status is seeded from the persisted records.
    ///
    /// # Errors
    ///
    /// Returns an error if existing anchor records cannot be read.
    pub fn new(
        chain: Arc<HashChain>,
        provider: Arc<dyn AnchorProvider>,
        store: AnchorStore,
        clock: Arc<dyn Clock>,
        interval: Duration,
        provider_timeout: Duration,
    ) -> Result<Self, AnchorError> {
        let mut status = AnchorStatus::default();
        if let Some(last) = store.last()? {
            status.last_anchor_at = Some(last.anchored_at.clone());
            status.last_anchor_count = last.anchored_count;
        }

        Ok(Self {
            chain,
            provider,
            store,
            clock,
            interval,
            provider_timeout,
            status: Arc::new(RwLock::new(status)),
            anchor_gate: Mutex::new(()),
        })
    }

    /// Shared handle to the scheduler status for the health endpoint.
    pub fn status_handle(&self) -> Arc<RwLock<AnchorStatus>> {
        self.status.clone()
    }

    /// Identifier of the configured provider.
    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// Runs the periodic anchor loop; spawned once at startup.
    pub async fn run(self: Arc<Self>) {
        info!(
            provider = self.provider.id(),
            interval_secs = self.interval.as_secs(),
            "anchor scheduler started"
        );
        loop {
            self.clock.sleep(self.interval).await;
            self.anchor_with_retry().await;
        }
    }

    /// Anchors the current root, retrying until it succeeds.
    pub async fn anchor_with_retry(&self) {
        let mut delay = RETRY_BASE_DELAY;
        loop {
            match self.anchor_once().await {
                Ok(Some(record)) => {
                    info!(
                        provider = self.provider.id(),
                        anchored_count = record.anchored_count,
                        merkle_root = %record.merkle_root,
                        "anchor recorded"
                    );
                    return;
                },
                Ok(None) => {
                    debug!("no new events since last anchor, skipping");
                    return;
                },
                Err(e) => {
                    warn!(
                        provider = self.provider.id(),
                        error = %e,
                        retry_in_secs = delay.as_secs(),
                        "anchor attempt failed"
                    );
                    self.status.write().await.last_error = Some(e.to_string());
                    self.clock.sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                },
            }
        }
    }

    /// Performs one anchor attempt.
    ///
    /// Returns `Ok(None)` when the tree is empty or nothing new has
    /// happened since the last anchor. At most one record is written per
    /// covered count: concurrent calls queue on the anchor gate.
    ///
    /// # Errors
    ///
    /// Returns provider, timeout, or persistence failures; the caller is
    /// responsible for retrying.
    pub async fn anchor_once(&self) -> Result<Option<AnchorRecord>, AnchorError> {
        let _gate = self.anchor_gate.lock().await;

        // Only the snapshot happens under the chain lock; the provider
        // call runs outside it.
        let snapshot = self.chain.snapshot().await;
        let Some(root) = snapshot.root else {
            return Ok(None);
        };

        let prev_anchor_count = self.store.last()?.map(|a| a.anchored_count).unwrap_or(0);
        if snapshot.size == prev_anchor_count {
            return Ok(None);
        }

        let proof = tokio::time::timeout(self.provider_timeout, self.provider.submit(&root))
            .await
            .map_err(|_| AnchorError::Timeout {
                provider: self.provider.id(),
                seconds: self.provider_timeout.as_secs(),
            })??;

        let record = AnchorRecord {
            anchored_count: snapshot.size,
            merkle_root: hex::encode(root),
            provider: self.provider.id().to_string(),
            proof: BASE64.encode(&proof.blob),
            anchored_at: proof.timestamp,
            prev_anchor_count,
        };
        self.store.append(&record)?;

        let mut status = self.status.write().await;
        status.last_anchor_at = Some(record.anchored_at.clone());
        status.last_anchor_count = record.anchored_count;
        status.last_error = None;

        Ok(Some(record))
    }
}
