//! Ed25519 key pair generator for the veriseal sidecar.
//!
//! Writes the private key as PKCS#8 PEM with owner-only permissions, the
//! public key as PEM, and the public key export JSON consumed by the
//! offline verifier.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ed25519_dalek::{
    pkcs8::{spki::der::pem::LineEnding, EncodePrivateKey, EncodePublicKey},
    SigningKey,
};
use rand::rngs::OsRng;
use veriseal_attestation::EventSigner;

#[derive(Debug, Parser)]
#[command(name = "veriseal-keygen", about = "Generate an Ed25519 signing key pair", version)]
struct Args {
    /// Directory to write key files into.
    #[arg(long, default_value = "./keys")]
    output_dir: PathBuf,

    /// Overwrite existing key files.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let private_path = args.output_dir.join("ed25519_private.pem");
    let public_pem_path = args.output_dir.join("ed25519_public.pem");
    let export_path = args.output_dir.join("ed25519_public.json");

    if private_path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite (this retires the old key)",
            private_path.display()
        );
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    let signing_key = SigningKey::generate(&mut OsRng);

    let private_pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("cannot encode private key as PKCS#8 PEM")?;
    std::fs::write(&private_path, private_pem.as_bytes())
        .with_context(|| format!("cannot write {}", private_path.display()))?;
    restrict_permissions(&private_path)?;

    let public_pem = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .context("cannot encode public key as PEM")?;
    std::fs::write(&public_pem_path, public_pem)
        .with_context(|| format!("cannot write {}", public_pem_path.display()))?;

    let signer = EventSigner::from_bytes(&signing_key.to_bytes());
    signer
        .export()
        .write_to(&export_path)
        .with_context(|| format!("cannot write {}", export_path.display()))?;

    println!("Generated Ed25519 key pair");
    println!("  private key: {}", private_path.display());
    println!("  public key:  {}", public_pem_path.display());
    println!("  export:      {}", export_path.display());
    println!("  key id:      {}", signer.key_id());

    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("cannot restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
