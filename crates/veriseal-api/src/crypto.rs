//! Webhook signature validation.
//!
//! HMAC-SHA256 over the raw request body, compared in constant time
//! against the `x-vcp-signature` header. Supports the common
//! `sha256=<hex>` prefix format as well as a bare hex digest.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Result of signature validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the signature is valid.
    pub is_valid: bool,
    /// Error message if validation failed.
    pub error_message: Option<String>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn valid() -> Self {
        Self { is_valid: true, error_message: None }
    }

    /// Creates a failed validation result with error message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self { is_valid: false, error_message: Some(message.into()) }
    }
}

/// Validates a webhook signature header against the shared secret.
pub fn validate_signature(payload: &[u8], signature: &str, secret: &str) -> ValidationResult {
    if signature.is_empty() {
        return ValidationResult::invalid("signature header is empty");
    }
    if secret.is_empty() {
        return ValidationResult::invalid("webhook secret is empty");
    }

    let hex_signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    if hex_signature.len() != 64 || !hex_signature.chars().all(|c| c.is_ascii_hexdigit()) {
        return ValidationResult::invalid("signature is not a SHA-256 hex digest");
    }

    let expected = generate_hmac_hex(payload, secret);
    if timing_safe_eq(hex_signature.as_bytes(), expected.as_bytes()) {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid("signature mismatch")
    }
}

/// Generates the HMAC-SHA256 of a payload as a lowercase hex string.
pub fn generate_hmac_hex(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time byte comparison.
fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_accepted() {
        let payload = b"webhook payload";
        let secret = "shared-secret";
        let signature = generate_hmac_hex(payload, secret);

        assert!(validate_signature(payload, &signature, secret).is_valid);
        assert!(validate_signature(payload, &format!("sha256={signature}"), secret).is_valid);
    }

    #[test]
    fn wrong_secret_rejected() {
        let payload = b"webhook payload";
        let signature = generate_hmac_hex(payload, "secret-a");

        let result = validate_signature(payload, &signature, "secret-b");
        assert!(!result.is_valid);
    }

    #[test]
    fn tampered_payload_rejected() {
        let secret = "shared-secret";
        let signature = generate_hmac_hex(b"original", secret);

        assert!(!validate_signature(b"tampered", &signature, secret).is_valid);
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert!(!validate_signature(b"x", "", "secret").is_valid);
        assert!(!validate_signature(b"x", "not-hex", "secret").is_valid);
        assert!(!validate_signature(b"x", "sha256=short", "secret").is_valid);
    }

    #[test]
    fn timing_safe_eq_semantics() {
        assert!(timing_safe_eq(b"abc", b"abc"));
        assert!(!timing_safe_eq(b"abc", b"abd"));
        assert!(!timing_safe_eq(b"abc", b"abcd"));
    }
}
