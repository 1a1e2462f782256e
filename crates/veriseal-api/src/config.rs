//! Configuration management for the veriseal sidecar.
//!
//! Configuration is loaded in priority order:
//! 1. Environment variables prefixed `VERISEAL_` (highest priority)
//! 2. Configuration file (`veriseal.toml`)
//! 3. Built-in defaults (lowest priority)
//!
//! Nested options use `__` in environment variables, so
//! `VERISEAL_ANCHOR__PROVIDER=local` overrides `anchor.provider`.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use veriseal_anchor::{ProviderKind, ProviderSettings};
use veriseal_core::Tier;

const CONFIG_FILE: &str = "veriseal.toml";

/// Complete service configuration with defaults, file and environment
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Compliance tier; selects the default anchor cadence.
    #[serde(default)]
    pub tier: Tier,

    /// Governing policy URN stamped into configuration-level records.
    #[serde(default = "default_policy_id")]
    pub policy_id: String,

    /// Anchoring options.
    #[serde(default)]
    pub anchor: AnchorConfig,

    /// HTTP server options.
    #[serde(default)]
    pub server: ServerConfig,

    /// Key file locations.
    #[serde(default)]
    pub keys: KeysConfig,

    /// On-disk storage options.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level configuration, `RUST_LOG` syntax.
    #[serde(default = "default_log_filter")]
    pub rust_log: String,
}

/// Anchoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Which anchor provider to use.
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Anchor interval override in hours; tier default when absent.
    #[serde(default)]
    pub interval_hours: Option<f64>,

    /// Per-call provider timeout in seconds.
    #[serde(default = "default_anchor_timeout")]
    pub timeout_seconds: u64,

    /// OpenTimestamps calendar base URLs.
    #[serde(default = "default_calendars")]
    pub calendars: Vec<String>,

    /// RFC 3161 TSA endpoint.
    #[serde(default = "default_tsa_url")]
    pub tsa_url: String,

    /// Bitcoin Core JSON-RPC endpoint.
    #[serde(default = "default_bitcoin_rpc_url")]
    pub bitcoin_rpc_url: String,

    /// Optional `user:password` for the Bitcoin RPC endpoint.
    #[serde(default)]
    pub bitcoin_rpc_auth: Option<String>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for webhook HMAC validation; unauthenticated when
    /// absent.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Key material locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// PKCS#8 PEM Ed25519 private key.
    #[serde(default = "default_private_path")]
    pub private_path: PathBuf,

    /// Public key export JSON.
    #[serde(default = "default_public_path")]
    pub public_path: PathBuf,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the event log and anchor records.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Config {
    /// Loads configuration from defaults, config file and environment.
    ///
    /// # Errors
    ///
    /// Returns an error when extraction or validation fails.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("VERISEAL_").split("__"));

        let config: Self = figment.extract().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Effective anchor interval: explicit override or the tier default.
    pub fn anchor_interval(&self) -> Duration {
        match self.anchor.interval_hours {
            Some(hours) => Duration::from_secs_f64(hours * 3600.0),
            None => self.tier.default_anchor_interval(),
        }
    }

    /// Per-call provider timeout.
    pub fn anchor_timeout(&self) -> Duration {
        Duration::from_secs(self.anchor.timeout_seconds)
    }

    /// Converts to the anchor crate's provider settings.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            timeout: self.anchor_timeout(),
            calendars: self.anchor.calendars.clone(),
            tsa_url: self.anchor.tsa_url.clone(),
            bitcoin_rpc_url: self.anchor.bitcoin_rpc_url.clone(),
            bitcoin_rpc_auth: self.anchor.bitcoin_rpc_auth.clone(),
        }
    }

    /// Parses the server socket address from host and port.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable host/port combination.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        SocketAddr::from_str(&addr).with_context(|| format!("invalid server address {addr}"))
    }

    /// Path of the append-only event log.
    pub fn events_path(&self) -> PathBuf {
        self.storage.data_dir.join("events.jsonl")
    }

    /// Path of the anchor records file.
    pub fn anchors_path(&self) -> PathBuf {
        self.storage.data_dir.join("anchors.jsonl")
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }
        if self.server.request_timeout == 0 {
            anyhow::bail!("server.request_timeout must be greater than 0");
        }
        if self.anchor.timeout_seconds == 0 {
            anyhow::bail!("anchor.timeout_seconds must be greater than 0");
        }
        if let Some(hours) = self.anchor.interval_hours {
            if !(hours > 0.0) {
                anyhow::bail!("anchor.interval_hours must be positive");
            }
        }
        if !self.policy_id.starts_with("urn:") {
            anyhow::bail!("policy_id must be a URN, got {:?}", self.policy_id);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tier: Tier::default(),
            policy_id: default_policy_id(),
            anchor: AnchorConfig::default(),
            server: ServerConfig::default(),
            keys: KeysConfig::default(),
            storage: StorageConfig::default(),
            rust_log: default_log_filter(),
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            interval_hours: None,
            timeout_seconds: default_anchor_timeout(),
            calendars: default_calendars(),
            tsa_url: default_tsa_url(),
            bitcoin_rpc_url: default_bitcoin_rpc_url(),
            bitcoin_rpc_auth: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_secret: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self { private_path: default_private_path(), public_path: default_public_path() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_policy_id() -> String {
    "urn:vso:policy:tv-retail:v1".to_string()
}

fn default_provider() -> ProviderKind {
    ProviderKind::Opentimestamps
}

fn default_anchor_timeout() -> u64 {
    60
}

fn default_calendars() -> Vec<String> {
    vec![
        "https://a.pool.opentimestamps.org".to_string(),
        "https://b.pool.opentimestamps.org".to_string(),
    ]
}

fn default_tsa_url() -> String {
    "http://timestamp.digicert.com".to_string()
}

fn default_bitcoin_rpc_url() -> String {
    "http://127.0.0.1:8332".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_private_path() -> PathBuf {
    PathBuf::from("./keys/ed25519_private.pem")
}

fn default_public_path() -> PathBuf {
    PathBuf::from("./keys/ed25519_public.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.tier, Tier::Silver);
        assert_eq!(config.anchor.provider, ProviderKind::Opentimestamps);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn tier_drives_default_interval() {
        let mut config = Config::default();
        assert_eq!(config.anchor_interval(), Duration::from_secs(86_400));

        config.tier = Tier::Gold;
        assert_eq!(config.anchor_interval(), Duration::from_secs(3_600));

        config.tier = Tier::Platinum;
        assert_eq!(config.anchor_interval(), Duration::from_secs(600));
    }

    #[test]
    fn explicit_interval_overrides_tier() {
        let mut config = Config::default();
        config.anchor.interval_hours = Some(0.5);
        assert_eq!(config.anchor_interval(), Duration::from_secs(1_800));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let config = Config { server: ServerConfig { port: 0, ..Default::default() }, ..Default::default() };
        assert!(config.validate().is_err());

        let config = Config {
            anchor: AnchorConfig { interval_hours: Some(0.0), ..Default::default() },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config { policy_id: "not-a-urn".to_string(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn storage_paths_derive_from_data_dir() {
        let config = Config {
            storage: StorageConfig { data_dir: PathBuf::from("/var/lib/veriseal") },
            ..Default::default()
        };
        assert_eq!(config.events_path(), PathBuf::from("/var/lib/veriseal/events.jsonl"));
        assert_eq!(config.anchors_path(), PathBuf::from("/var/lib/veriseal/anchors.jsonl"));
    }

    #[test]
    fn socket_address_parses() {
        let config = Config::default();
        let addr = config.server_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
