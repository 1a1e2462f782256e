//! Command-line front end for the offline verifier.
//!
//! Reads the persisted event log, anchor records and public key exports,
//! runs the full check suite and prints the report. Exit code 0 when all
//! checks pass, 1 otherwise.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use veriseal_attestation::PublicKeyExport;
use veriseal_ledger::{AnchorStore, EventLog};
use veriseal_verifier::{verify_log, KeySet};

#[derive(Debug, Parser)]
#[command(
    name = "veriseal-verify",
    about = "Verify a veriseal event log against its anchors and signing keys",
    version
)]
struct Args {
    /// Path to the append-only event log (JSON lines).
    events: PathBuf,

    /// Path to the anchor records file.
    #[arg(short, long)]
    anchors: Option<PathBuf>,

    /// Public key export JSON; repeat for rotated keys.
    #[arg(short = 'k', long = "public-key")]
    public_keys: Vec<PathBuf>,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let events = EventLog::read_all(&args.events)
        .with_context(|| format!("cannot read event log {}", args.events.display()))?;

    let anchors = match &args.anchors {
        Some(path) => AnchorStore::read_all_from(path)
            .with_context(|| format!("cannot read anchor records {}", path.display()))?,
        None => Vec::new(),
    };

    let mut exports = Vec::with_capacity(args.public_keys.len());
    for path in &args.public_keys {
        exports.push(
            PublicKeyExport::read_from(path)
                .with_context(|| format!("cannot read public key export {}", path.display()))?,
        );
    }
    let keys = KeySet::from_exports(&exports).context("invalid public key export")?;

    let report = verify_log(&events, &anchors, &keys);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
