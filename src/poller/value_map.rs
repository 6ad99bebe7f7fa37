//! Mapping of device response bodies onto characteristic readings

use crate::error::{BridgeError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Characteristic name to numeric reading, produced fresh by each poll
pub type ValueMap = BTreeMap<String, f64>;

/// Extract the allow-listed characteristics from a JSON response body.
///
/// Properties are matched by exact name. Missing properties and values
/// that do not coerce to a finite number are logged and skipped; if
/// nothing remains the poll counts as failed.
pub fn parse_values(body: &str, allow_list: &[String], endpoint: &str) -> Result<ValueMap> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| BridgeError::parse(format!("{endpoint}: {e}")))?;

    let Value::Object(fields) = parsed else {
        return Err(BridgeError::parse(format!(
            "{endpoint}: expected a JSON object"
        )));
    };

    let mut values = ValueMap::new();
    for name in allow_list {
        match fields.get(name) {
            Some(raw) => {
                let number = coerce_number(raw);
                if !number.is_finite() {
                    warn!(characteristic = %name, %raw, "Value is not a finite number");
                } else {
                    values.insert(name.clone(), number);
                }
            }
            None => warn!(characteristic = %name, endpoint, "Device reported no information"),
        }
    }

    if values.is_empty() {
        return Err(BridgeError::empty_result(endpoint));
    }

    Ok(values)
}

/// Numeric conversion with the loose rules device firmwares rely on:
/// booleans become 0/1, `null` and blank strings become 0, numeric strings
/// (including hex) are parsed and anything else is NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => coerce_str(text),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] if !single.is_array() && !single.is_object() => match single {
                Value::String(text) => coerce_str(text),
                Value::Null => 0.0,
                Value::Bool(_) => f64::NAN,
                other => coerce_number(other),
            },
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn coerce_str(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| text.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix {
        return u64::from_str_radix(digits, radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let is_decimal = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !is_decimal {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}
