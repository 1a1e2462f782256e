//! Deterministic JSON serialization per RFC 8785 (JCS).
//!
//! Produces a byte-exact canonical form so that hashing an event yields the
//! same digest in every implementation, decades apart. Object keys are
//! sorted by UTF-16 code unit order, whitespace is eliminated, strings use
//! minimal escaping, and numbers follow the RFC 8785 rendering rules.
//!
//! The canonical form feeds directly into SHA-256; any deviation here
//! breaks reproducibility of every stored `event_hash`.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CanonicalError;

/// Renders a JSON value into its canonical byte string.
///
/// # Errors
///
/// Returns `CanonicalError::NonFiniteNumber` for NaN or infinite floats
/// (unreachable for values parsed from JSON text, reachable for values
/// constructed programmatically).
pub fn canonical_json(value: &Value) -> Result<String, CanonicalError> {
    let mut out = String::with_capacity(128);
    write_value(value, &mut out)?;
    Ok(out)
}

/// Computes the SHA-256 digest of the canonical form of a value.
///
/// This is the "event digest" of the evidence pipeline: the raw 32 bytes
/// that get signed and appended to the Merkle tree.
///
/// # Errors
///
/// Propagates canonicalization failures.
pub fn canonical_digest(value: &Value) -> Result<[u8; 32], CanonicalError> {
    let canonical = canonical_json(value)?;
    Ok(Sha256::digest(canonical.as_bytes()).into())
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        },
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                // Key came from the map it was collected from.
                if let Some(child) = map.get(*key) {
                    write_value(child, out)?;
                }
            }
            out.push('}');
        },
    }
    Ok(())
}

/// Writes a string with RFC 8785 minimal escaping.
///
/// Only `"`, `\` and control characters below 0x20 are escaped; everything
/// else is emitted as raw UTF-8. Short escape forms are used where JSON
/// defines them, lowercase `\u00xx` otherwise.
fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            },
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<(), CanonicalError> {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{i}");
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        let _ = write!(out, "{u}");
        return Ok(());
    }
    let f = n.as_f64().ok_or_else(|| CanonicalError::UnrepresentableNumber {
        token: n.to_string(),
    })?;
    if !f.is_finite() {
        return Err(CanonicalError::NonFiniteNumber);
    }
    out.push_str(&format_f64(f));
    Ok(())
}

/// Formats a finite double per the RFC 8785 number rules.
///
/// Whole numbers inside the 2^53 safe-integer range render without a
/// fractional part (`52000`, not `52000.0`), zero renders `0` regardless of
/// sign, magnitudes at or above 1e21 or below 1e-6 use ECMAScript exponent
/// notation, and everything else uses the shortest round-trippable decimal
/// form.
fn format_f64(f: f64) -> String {
    const SAFE_INTEGER_BOUND: f64 = 9_007_199_254_740_992.0; // 2^53

    if f == 0.0 {
        return "0".to_string();
    }

    let abs = f.abs();
    if f.fract() == 0.0 && abs < SAFE_INTEGER_BOUND {
        return format!("{f:.0}");
    }

    if abs >= 1e21 || abs < 1e-6 {
        // Rust's {:e} omits the '+' on positive exponents; ECMAScript
        // requires it ("1e+21").
        let s = format!("{f:e}");
        if s.contains("e-") {
            return s;
        }
        return s.replacen('e', "e+", 1);
    }

    format!("{f}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_render_as_literals() {
        assert_eq!(canonical_json(&json!(null)).unwrap(), "null");
        assert_eq!(canonical_json(&json!(true)).unwrap(), "true");
        assert_eq!(canonical_json(&json!(false)).unwrap(), "false");
    }

    #[test]
    fn object_keys_sorted_without_whitespace() {
        let value = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"a":2,"b":1,"c":{"y":2,"z":1}}"#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(canonical_json(&json!({})).unwrap(), "{}");
        assert_eq!(canonical_json(&json!([])).unwrap(), "[]");
    }

    #[test]
    fn arrays_preserve_input_order() {
        let value = json!([3, 1, 2, {"b": 0, "a": 0}]);
        assert_eq!(canonical_json(&value).unwrap(), r#"[3,1,2,{"a":0,"b":0}]"#);
    }

    #[test]
    fn integers_render_without_fraction() {
        assert_eq!(canonical_json(&json!(52000)).unwrap(), "52000");
        assert_eq!(canonical_json(&json!(-7)).unwrap(), "-7");
        assert_eq!(canonical_json(&json!(0)).unwrap(), "0");
    }

    #[test]
    fn whole_floats_render_as_integers() {
        let value: Value = serde_json::from_str("52000.0").unwrap();
        assert_eq!(canonical_json(&value).unwrap(), "52000");
    }

    #[test]
    fn fractional_floats_render_shortest() {
        let value: Value = serde_json::from_str("52005.50").unwrap();
        assert_eq!(canonical_json(&value).unwrap(), "52005.5");

        let value: Value = serde_json::from_str("0.1").unwrap();
        assert_eq!(canonical_json(&value).unwrap(), "0.1");
    }

    #[test]
    fn negative_zero_renders_as_zero() {
        let value: Value = serde_json::from_str("-0.0").unwrap();
        assert_eq!(canonical_json(&value).unwrap(), "0");
    }

    #[test]
    fn large_magnitudes_use_exponent_notation() {
        assert_eq!(format_f64(1e21), "1e+21");
        assert_eq!(format_f64(2.5e-7), "2.5e-7");
        assert_eq!(format_f64(1e16), "10000000000000000");
    }

    #[test]
    fn string_escaping_is_minimal() {
        let value = json!("a\"b\\c\nd\te\u{1}");
        assert_eq!(canonical_json(&value).unwrap(), "\"a\\\"b\\\\c\\nd\\te\\u0001\"");
    }

    #[test]
    fn non_ascii_emitted_raw() {
        let value = json!("héllo €");
        assert_eq!(canonical_json(&value).unwrap(), "\"héllo €\"");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let value = json!({"z": [1, 2.5], "a": {"m": "x", "b": null}});
        let once = canonical_json(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonical_json(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn key_order_does_not_affect_digest() {
        let a: Value = serde_json::from_str(r#"{"qty":0.1,"side":"BUY","symbol":"BTCUSD"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"symbol":"BTCUSD","qty":0.1,"side":"BUY"}"#).unwrap();
        assert_eq!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
    }

    #[test]
    fn digest_matches_sha256_of_canonical_bytes() {
        let value = json!({"k": "v"});
        let canonical = canonical_json(&value).unwrap();
        let expected: [u8; 32] = Sha256::digest(canonical.as_bytes()).into();
        assert_eq!(canonical_digest(&value).unwrap(), expected);
    }
}
