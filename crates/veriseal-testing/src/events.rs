//! Event fixture builders for deterministic testing.
//!
//! Builder pattern with sensible defaults; every field can be overridden
//! so tests construct exactly the shape they need.

use serde_json::{json, Value};
use veriseal_core::{ClockSync, EventRecord, EventType, Tier, VCP_VERSION};

/// Shorthand for a default ORDER_NEW event with the given identifier.
pub fn order_new(event_id: &str) -> EventRecord {
    EventBuilder::new(event_id).build()
}

/// Builder for test event records.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event_id: String,
    timestamp: String,
    event_type: EventType,
    tier: Tier,
    policy_id: String,
    clock_sync: ClockSync,
    system_id: String,
    account_id: String,
    payload: Value,
}

impl EventBuilder {
    /// Creates a builder with defaults for everything but the identifier.
    pub fn new(event_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            timestamp: "2025-06-15T12:00:00.000Z".to_string(),
            event_type: EventType::OrderNew,
            tier: Tier::Silver,
            policy_id: "urn:vso:policy:tv-retail:v1".to_string(),
            clock_sync: ClockSync::BestEffort,
            system_id: "tradingview-sidecar-test".to_string(),
            account_id: "ACC-TEST-1".to_string(),
            payload: json!({"symbol": "BTCUSD", "side": "BUY", "qty": 0.1}),
        }
    }

    /// Sets the event type.
    #[must_use]
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// Sets the compliance tier.
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Sets the clock sync status.
    #[must_use]
    pub fn clock_sync(mut self, clock_sync: ClockSync) -> Self {
        self.clock_sync = clock_sync;
        self
    }

    /// Sets the timestamp string (carried verbatim through hashing).
    #[must_use]
    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }

    /// Sets the account identifier.
    #[must_use]
    pub fn account(mut self, account_id: &str) -> Self {
        self.account_id = account_id.to_string();
        self
    }

    /// Replaces the payload object.
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Builds the event record.
    pub fn build(self) -> EventRecord {
        EventRecord {
            vcp_version: VCP_VERSION.to_string(),
            event_id: self.event_id,
            timestamp: self.timestamp,
            event_type: self.event_type,
            tier: self.tier,
            policy_id: self.policy_id,
            clock_sync: self.clock_sync,
            system_id: self.system_id,
            account_id: self.account_id,
            payload: self.payload,
        }
    }
}
