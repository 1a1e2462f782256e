//! Built-in anchor provider implementations.

pub mod bitcoin;
pub mod local;
pub mod opentimestamps;
pub mod rfc3161;

use chrono::{SecondsFormat, Utc};

/// ISO-8601 millisecond UTC timestamp for anchor statements.
pub(crate) fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
