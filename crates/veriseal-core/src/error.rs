//! Error types for canonicalization and event validation.

use thiserror::Error;

/// Errors produced while rendering a value into canonical form.
///
/// Canonicalization is total over everything `serde_json` can parse; these
/// variants guard the values that cannot be represented deterministically.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Number is NaN or infinite and has no canonical rendering.
    #[error("non-finite number cannot be canonicalized")]
    NonFiniteNumber,

    /// Number uses a representation outside i64/u64/f64.
    #[error("number {token} is not representable as a canonical JSON number")]
    UnrepresentableNumber {
        /// Source token of the offending number.
        token: String,
    },
}

/// Validation failures for an inbound event record.
///
/// All of these map to HTTP 400 at the webhook boundary; none of them
/// result in a log append.
#[derive(Debug, Error)]
pub enum EventValidationError {
    /// Required string field is empty.
    #[error("field {field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Payload is not a JSON object.
    #[error("payload must be a JSON object, got {found}")]
    PayloadNotObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// Timestamp is not ISO-8601 with a UTC `Z` suffix.
    #[error("timestamp {value:?} is not ISO-8601 UTC")]
    InvalidTimestamp {
        /// The rejected timestamp string.
        value: String,
    },
}
