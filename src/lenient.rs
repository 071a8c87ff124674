//! Forgiving deserializers for model-produced JSON.
//!
//! The model is asked for a fixed schema but regularly writes numbers as
//! strings, strings as numbers, or `null` for fields it could not read.
//! Every helper here accepts any JSON value and falls back to the field's
//! default instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any scalar rendered as text. `null` and containers become `""`.
pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(d)?).unwrap_or_default())
}

pub(crate) fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(d)?))
}

/// A number, or a string holding one (`"1500.00"`, `"1.500,00"`, `"R$ 10"`).
pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(to_f64(&Value::deserialize(d)?).unwrap_or_default())
}

pub(crate) fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(to_f64(&Value::deserialize(d)?))
}

/// A non-negative whole number. Unreadable values become `0`.
pub(crate) fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(to_u32(&Value::deserialize(d)?).unwrap_or_default())
}

/// An array whose elements are decoded one by one; elements that do not
/// decode are dropped. Anything other than an array is an empty list.
pub(crate) fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A nested object, or `T::default()` for `null`, scalars and arrays.
pub(crate) fn object<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(d)? {
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => T::default(),
    })
}

pub(crate) fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

pub(crate) fn to_u32(value: &Value) -> Option<u32> {
    to_f64(value)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32)
}

/// Parse a decimal written either plainly or in pt-BR notation.
fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_prefix("R$").unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }
    let parsed = s
        .parse::<f64>()
        .ok()
        .or_else(|| s.replace('.', "").replace(',', ".").parse::<f64>().ok());
    parsed.filter(|n| n.is_finite())
}
