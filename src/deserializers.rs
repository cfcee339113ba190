// src/deserializers.rs

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a JSON value the way a loosely typed form or script would send it and
/// turns it into an integer.
///
/// Numbers are truncated toward zero and numeric strings are parsed after
/// trimming, including unsigned `0x`/`0o`/`0b` literals. Booleans count as
/// 1/0. Anything else becomes 0.
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_i64).unwrap_or(0))
}

pub fn coerce_i64(value: &Value) -> i64 {
    let number = match value {
        Value::Number(n) => n.as_i64().map(|i| i as f64).or_else(|| n.as_f64()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                parse_prefixed_integer(trimmed).or_else(|| trimmed.parse::<f64>().ok())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => n.trunc() as i64,
        _ => 0,
    }
}

/// `0x1f`, `0O17`, `0b101`. Signs are not allowed with a prefix.
fn parse_prefixed_integer(s: &str) -> Option<f64> {
    let radix = match s.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        // Not a number at all, rather than a decimal parse of the rest
        return Some(f64::NAN);
    }
    u64::from_str_radix(digits, radix)
        .map(|n| n as f64)
        .ok()
        .or(Some(f64::INFINITY))
}
