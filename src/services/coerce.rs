//! Lenient conversions for form input.
//!
//! Browsers send everything as strings and JSON clients send a mix, so numeric
//! fields accept both and quietly become `None` when they cannot be parsed.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Trims, and maps an empty string to `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Strips thousands separators and a leading currency sign: `"$12,500"` -> `"12500"`.
fn normalize_number(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect()
}

pub fn parse_f64(value: Option<&str>) -> Option<f64> {
    let n: f64 = normalize_number(value?).parse().ok()?;
    n.is_finite().then_some(n)
}

/// Integers also accept a whole-valued decimal (`"2019.0"`).
pub fn parse_i32(value: Option<&str>) -> Option<i32> {
    let normalized = normalize_number(value?);
    normalized.parse::<i32>().ok().or_else(|| {
        let f: f64 = normalized.parse().ok()?;
        (f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64).then_some(f as i32)
    })
}

pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), "%Y-%m-%d").ok()
}

pub fn parse_uuid(value: Option<&str>) -> Option<Uuid> {
    Uuid::parse_str(value?.trim()).ok()
}

/// Raw JSON scalar as text; objects and arrays are treated as absent.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(non_empty(scalar_text(deserializer)?.as_deref()))
}

pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(parse_f64(scalar_text(deserializer)?.as_deref()))
}

pub fn opt_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(parse_i32(scalar_text(deserializer)?.as_deref()))
}

pub fn opt_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    Ok(parse_date(scalar_text(deserializer)?.as_deref()))
}

pub fn opt_uuid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    Ok(parse_uuid(scalar_text(deserializer)?.as_deref()))
}
