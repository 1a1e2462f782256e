//! Trading event data model.
//!
//! An [`EventRecord`] is the ephemeral inbound webhook payload; a
//! [`SealedEvent`] is the immutable persisted form with chain link, digest,
//! signature and tree position attached. The canonical subset used for
//! hashing covers the inbound fields plus `prev_hash` and excludes the
//! other augmentation fields.

use std::{fmt, time::Duration};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    canonical::canonical_digest,
    error::{CanonicalError, EventValidationError},
};

/// Protocol version stamped on every event.
pub const VCP_VERSION: &str = "1.1";

/// Enumerated trading event types accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A new order was submitted.
    OrderNew,
    /// An order was filled.
    OrderFilled,
    /// A position was closed.
    PositionClose,
    /// An algorithm parameter was changed.
    AlgoParameterChange,
}

impl EventType {
    /// Wire-format name of the event type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderNew => "ORDER_NEW",
            Self::OrderFilled => "ORDER_FILLED",
            Self::PositionClose => "POSITION_CLOSE",
            Self::AlgoParameterChange => "ALGO_PARAMETER_CHANGE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance tier selecting the anchor cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Retail tier, anchored every 24 hours.
    #[default]
    Silver,
    /// Institutional tier, anchored every hour.
    Gold,
    /// HFT/exchange tier, anchored every 10 minutes.
    Platinum,
}

impl Tier {
    /// Wire-format name of the tier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
        }
    }

    /// Default anchoring interval mandated for this tier.
    pub const fn default_anchor_interval(self) -> Duration {
        match self {
            Self::Silver => Duration::from_secs(24 * 60 * 60),
            Self::Gold => Duration::from_secs(60 * 60),
            Self::Platinum => Duration::from_secs(10 * 60),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clock synchronization quality reported by the emitting system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockSync {
    /// No synchronization guarantee.
    BestEffort,
    /// NTP-disciplined clock.
    NtpSynced,
    /// PTP-disciplined clock.
    PtpLocked,
}

impl ClockSync {
    /// Wire-format name of the sync status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BestEffort => "BEST_EFFORT",
            Self::NtpSynced => "NTP_SYNCED",
            Self::PtpLocked => "PTP_LOCKED",
        }
    }
}

impl fmt::Display for ClockSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound trading event as received on the webhook.
///
/// The `timestamp` string is carried verbatim through canonicalization and
/// persistence; it is validated but never re-formatted, so a submitter with
/// extra sub-millisecond precision still gets a reproducible hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Protocol version, e.g. "1.1".
    pub vcp_version: String,
    /// Unique event identifier assigned by the emitting system.
    pub event_id: String,
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
    /// Trading event type.
    pub event_type: EventType,
    /// Compliance tier of the emitting system.
    pub tier: Tier,
    /// Governing policy URN.
    pub policy_id: String,
    /// Clock synchronization status.
    pub clock_sync: ClockSync,
    /// Identifier of the emitting trading system.
    pub system_id: String,
    /// Trading account identifier.
    pub account_id: String,
    /// Event-specific payload; arbitrarily nested JSON object.
    pub payload: Value,
}

impl EventRecord {
    /// Validates the record against the webhook schema.
    ///
    /// # Errors
    ///
    /// Returns the first schema violation found: an empty required field,
    /// a non-object payload, or a timestamp that is not ISO-8601 UTC.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        for (field, value) in [
            ("vcp_version", &self.vcp_version),
            ("event_id", &self.event_id),
            ("timestamp", &self.timestamp),
            ("policy_id", &self.policy_id),
            ("system_id", &self.system_id),
            ("account_id", &self.account_id),
        ] {
            if value.is_empty() {
                return Err(EventValidationError::EmptyField { field });
            }
        }

        if !self.payload.is_object() {
            return Err(EventValidationError::PayloadNotObject {
                found: json_type_name(&self.payload),
            });
        }

        // Parsed only to validate; the original string stays authoritative.
        if !self.timestamp.ends_with('Z')
            || DateTime::parse_from_rfc3339(&self.timestamp).is_err()
        {
            return Err(EventValidationError::InvalidTimestamp {
                value: self.timestamp.clone(),
            });
        }

        Ok(())
    }

    /// Assembles the canonical subset covered by the event hash.
    ///
    /// Covers the inbound fields plus `prev_hash` when present. The
    /// augmentation fields (`event_hash`, `signature`, `merkle_index`,
    /// `signer_key_id`) are never part of the hashed form.
    pub fn canonical_subset(&self, prev_hash: Option<&str>) -> Value {
        let mut map = Map::new();
        map.insert("account_id".into(), Value::String(self.account_id.clone()));
        map.insert("clock_sync".into(), Value::String(self.clock_sync.as_str().into()));
        map.insert("event_id".into(), Value::String(self.event_id.clone()));
        map.insert("event_type".into(), Value::String(self.event_type.as_str().into()));
        map.insert("payload".into(), self.payload.clone());
        map.insert("policy_id".into(), Value::String(self.policy_id.clone()));
        if let Some(prev) = prev_hash {
            map.insert("prev_hash".into(), Value::String(prev.into()));
        }
        map.insert("system_id".into(), Value::String(self.system_id.clone()));
        map.insert("tier".into(), Value::String(self.tier.as_str().into()));
        map.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        map.insert("vcp_version".into(), Value::String(self.vcp_version.clone()));
        Value::Object(map)
    }

    /// Computes the 32-byte event digest for a given chain position.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures from the payload.
    pub fn digest(&self, prev_hash: Option<&str>) -> Result<[u8; 32], CanonicalError> {
        canonical_digest(&self.canonical_subset(prev_hash))
    }
}

/// Persisted, immutable form of an event.
///
/// Written exactly once by the seal pipeline as one line of the append-only
/// event log and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedEvent {
    /// The inbound event fields, flattened into the same JSON object.
    #[serde(flatten)]
    pub event: EventRecord,
    /// Hex digest of the previous sealed event; absent at sequence 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    /// Hex SHA-256 of the canonical subset (including `prev_hash`).
    pub event_hash: String,
    /// Base64 Ed25519 signature over the raw 32-byte digest.
    pub signature: String,
    /// Dense, zero-based position in the log and Merkle tree.
    pub merkle_index: u64,
    /// Stable identifier of the signing key.
    pub signer_key_id: String,
}

impl SealedEvent {
    /// Recomputes the event digest from the canonical subset.
    ///
    /// Used by replay and the verifier to check invariant 3: canonicalizing
    /// and hashing again must reproduce the stored `event_hash`.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures from the payload.
    pub fn recompute_digest(&self) -> Result<[u8; 32], CanonicalError> {
        self.event.digest(self.prev_hash.as_deref())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::canonical::canonical_json;

    fn sample_event() -> EventRecord {
        EventRecord {
            vcp_version: VCP_VERSION.to_string(),
            event_id: "E0".to_string(),
            timestamp: "2025-06-15T12:00:00.000Z".to_string(),
            event_type: EventType::OrderNew,
            tier: Tier::Silver,
            policy_id: "urn:vso:policy:tv-retail:v1".to_string(),
            clock_sync: ClockSync::BestEffort,
            system_id: "tradingview-webhook".to_string(),
            account_id: "ACC-1".to_string(),
            payload: json!({"symbol": "BTCUSD", "side": "BUY", "qty": 0.1}),
        }
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(EventType::OrderNew).unwrap(), json!("ORDER_NEW"));
        assert_eq!(
            serde_json::to_value(EventType::AlgoParameterChange).unwrap(),
            json!("ALGO_PARAMETER_CHANGE")
        );
        assert_eq!(serde_json::to_value(Tier::Platinum).unwrap(), json!("PLATINUM"));
        assert_eq!(serde_json::to_value(ClockSync::PtpLocked).unwrap(), json!("PTP_LOCKED"));
    }

    #[test]
    fn tier_intervals_follow_compliance_schedule() {
        assert_eq!(Tier::Silver.default_anchor_interval(), Duration::from_secs(86_400));
        assert_eq!(Tier::Gold.default_anchor_interval(), Duration::from_secs(3_600));
        assert_eq!(Tier::Platinum.default_anchor_interval(), Duration::from_secs(600));
    }

    #[test]
    fn valid_event_passes_validation() {
        sample_event().validate().unwrap();
    }

    #[test]
    fn empty_event_id_rejected() {
        let mut event = sample_event();
        event.event_id.clear();
        assert!(matches!(
            event.validate(),
            Err(EventValidationError::EmptyField { field: "event_id" })
        ));
    }

    #[test]
    fn non_object_payload_rejected() {
        let mut event = sample_event();
        event.payload = json!([1, 2, 3]);
        assert!(matches!(event.validate(), Err(EventValidationError::PayloadNotObject { .. })));
    }

    #[test]
    fn non_utc_timestamp_rejected() {
        let mut event = sample_event();
        event.timestamp = "2025-06-15T12:00:00.000+02:00".to_string();
        assert!(matches!(event.validate(), Err(EventValidationError::InvalidTimestamp { .. })));

        event.timestamp = "not-a-timestamp-Z".to_string();
        assert!(matches!(event.validate(), Err(EventValidationError::InvalidTimestamp { .. })));
    }

    #[test]
    fn canonical_subset_excludes_augmentation_fields() {
        let event = sample_event();
        let subset = event.canonical_subset(None);
        let obj = subset.as_object().unwrap();

        assert!(obj.contains_key("event_id"));
        assert!(obj.contains_key("payload"));
        assert!(!obj.contains_key("prev_hash"));
        assert!(!obj.contains_key("event_hash"));
        assert!(!obj.contains_key("signature"));
        assert!(!obj.contains_key("merkle_index"));
        assert!(!obj.contains_key("signer_key_id"));
    }

    #[test]
    fn canonical_subset_includes_prev_hash_when_linked() {
        let event = sample_event();
        let subset = event.canonical_subset(Some("ab".repeat(32).as_str()));
        assert!(subset.as_object().unwrap().contains_key("prev_hash"));

        // prev_hash changes the digest.
        assert_ne!(event.digest(None).unwrap(), event.digest(Some("00")).unwrap());
    }

    #[test]
    fn canonical_subset_key_order_is_total() {
        let event = sample_event();
        let canonical = canonical_json(&event.canonical_subset(Some("aa"))).unwrap();

        // Keys appear in UTF-16 order, with prev_hash between policy_id and
        // system_id.
        let positions: Vec<usize> = [
            "\"account_id\"",
            "\"clock_sync\"",
            "\"event_id\"",
            "\"event_type\"",
            "\"payload\"",
            "\"policy_id\"",
            "\"prev_hash\"",
            "\"system_id\"",
            "\"tier\"",
            "\"timestamp\"",
            "\"vcp_version\"",
        ]
        .iter()
        .map(|k| canonical.find(k).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn sealed_event_round_trips_as_flat_json() {
        let event = sample_event();
        let digest = event.digest(None).unwrap();
        let sealed = SealedEvent {
            event,
            prev_hash: None,
            event_hash: hex_encode(&digest),
            signature: "c2ln".to_string(),
            merkle_index: 0,
            signer_key_id: "key".to_string(),
        };

        let line = serde_json::to_string(&sealed).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        // Flattened: event fields live at the top level.
        assert_eq!(parsed["event_id"], json!("E0"));
        assert_eq!(parsed["merkle_index"], json!(0));
        assert!(parsed.get("prev_hash").is_none());

        let back: SealedEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(back, sealed);
        assert_eq!(back.recompute_digest().unwrap(), digest);
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
