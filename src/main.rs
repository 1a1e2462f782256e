//! Veriseal evidence sidecar.
//!
//! Main entry point: loads configuration, brings up the signer and the
//! hash chain (replaying the persisted log), starts the anchor scheduler
//! and serves the webhook API until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use veriseal_anchor::{build_provider, AnchorScheduler};
use veriseal_api::{AppState, Config};
use veriseal_attestation::EventSigner;
use veriseal_core::RealClock;
use veriseal_ledger::{AnchorStore, HashChain};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    info!(
        tier = %config.tier,
        provider = %config.anchor.provider,
        data_dir = %config.storage.data_dir.display(),
        "starting veriseal evidence sidecar"
    );

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!("cannot create data directory {}", config.storage.data_dir.display())
    })?;

    // No ready signer, no pipeline: an unreadable key is fatal at startup.
    let signer = Arc::new(EventSigner::from_pem_file(&config.keys.private_path).with_context(
        || {
            format!(
                "cannot load signing key from {} (generate one with veriseal-keygen)",
                config.keys.private_path.display()
            )
        },
    )?);
    info!(key_id = signer.key_id(), "signing key loaded");

    // Keep the public key export current for offline verifiers.
    signer
        .export()
        .write_to(&config.keys.public_path)
        .with_context(|| format!("cannot write {}", config.keys.public_path.display()))?;

    // Replay verifies every stored hash and chain link; a corrupt log
    // refuses to open rather than accept new writes over bad history.
    let chain = Arc::new(
        HashChain::open(&config.events_path(), signer.clone())
            .context("event log replay failed")?,
    );
    info!(events = chain.len().await, "hash chain ready");

    let store = AnchorStore::open(config.anchors_path())?;
    let provider = build_provider(config.anchor.provider, &config.provider_settings(), signer)?;
    let clock = Arc::new(RealClock::new());

    let scheduler = Arc::new(AnchorScheduler::new(
        chain.clone(),
        provider,
        store,
        clock.clone(),
        config.anchor_interval(),
        config.anchor_timeout(),
    )?);
    tokio::spawn(scheduler.clone().run());

    let state = AppState::new(
        chain,
        scheduler,
        config.tier,
        config.server.webhook_secret.clone(),
        clock,
    );

    let addr = config.server_addr()?;
    veriseal_api::start_server(state, addr, &config).await.context("HTTP server failed")?;

    info!("veriseal shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
