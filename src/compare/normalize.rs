//! Value normalization for status write-back
//!
//! Decoded API values are canonicalized before being stored into the
//! resource's observed-state subtree, so the next reconciliation's
//! comparison pass never trips over a `1` that came back as `1.0`.

use serde_json::{Map, Number, Value};

/// Deep-copy a value, canonicalizing numbers: integers become i64 where
/// representable (u64 beyond i64::MAX is kept as-is), and floats fold to
/// i64 only when they are exactly an integer. Server-assigned identifiers
/// survive this round-trip bit-for-bit.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Number(number) => normalize_number(number),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), normalize(item));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn normalize_number(number: &Number) -> Value {
    if let Some(i) = number.as_i64() {
        return Value::Number(Number::from(i));
    }
    if number.as_u64().is_some() {
        return Value::Number(number.clone());
    }
    match number.as_f64() {
        Some(f) => {
            // `i64::MAX as f64` rounds up to 2^63, which is out of range,
            // so the upper bound is exclusive.
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                let folded = f as i64;
                if folded as f64 == f {
                    return Value::Number(Number::from(folded));
                }
            }
            float_value(f)
        }
        None => Value::Number(number.clone()),
    }
}

/// Build a JSON value from a raw float. Interchange formats require finite
/// numbers, so `NaN` and the infinities are rendered as their textual form
/// rather than dropped.
pub fn float_value(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(number) => Value::Number(number),
        None => Value::String(f.to_string()),
    }
}

/// Render a value for a path or query slot, or for a mismatch reason.
/// Strings are unquoted; composites fall back to their JSON rendering.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => composite.to_string(),
    }
}

/// Number equality across integer and float representations: equal iff
/// both denote exactly the same numeric value. `5` equals `5.0`; `42`
/// does not equal `42.9`.
pub(crate) fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
