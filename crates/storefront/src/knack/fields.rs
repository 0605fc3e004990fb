//! Value coercions for Knack records.
//!
//! Knack returns the same field in different shapes depending on its type
//! and on how the object was built: plain strings, numbers, HTML snippets
//! for connections, arrays of `{id, identifier}` objects, or file objects.
//! These helpers flatten those shapes into plain Rust values.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use super::Record;

static CONNECTION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-kn="connection-value">([^<]+)<"#).expect("Invalid regex")
});

static TAG_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<]+)<").expect("Invalid regex"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// Look a field up by key, falling back to its display name.
///
/// Empty keys mark optional fields that the object does not have. Nulls are
/// treated as missing.
#[must_use]
pub fn field<'a>(record: &'a Record, key: &str, name: &str) -> Option<&'a Value> {
    let present = |k: &str| record.get(k).filter(|v| !v.is_null());
    if !key.is_empty()
        && let Some(value) = present(key)
    {
        return Some(value);
    }
    if name.is_empty() { None } else { present(name) }
}

/// Text value of a field. Blank strings are `None`.
#[must_use]
pub fn text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Record id (`id` key) as a string.
#[must_use]
pub fn record_id(record: &Record) -> Option<String> {
    text(record.get("id"))
}

/// Numeric value of a field.
///
/// Accepts numbers and strings such as `"$12.50"` or `"1,250"`.
#[must_use]
pub fn decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Decimal::from_str(&cleaned).ok()
            }
        }
        _ => None,
    }
}

/// Yes/No stock field: `Some(true)` in stock, `Some(false)` out, `None` unknown.
#[must_use]
pub fn stock_flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "Yes" | "yes" | "true" | "1" => Some(true),
            "No" | "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Boolean flag that defaults to `false` when unset or unrecognised.
#[must_use]
pub fn flag(value: Option<&Value>) -> bool {
    stock_flag(value).unwrap_or(false)
}

/// First URL found in an image or file field.
///
/// Handles plain URLs, JSON-encoded strings, arrays (first element) and file
/// objects with `url`, `file.url`, `file_url`, `link`, `src` or `raw`.
#[must_use]
pub fn image_url(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(s) {
                Ok(parsed @ (Value::Array(_) | Value::Object(_))) => image_url(Some(&parsed)),
                _ => Some(s.to_string()),
            }
        }
        Value::Array(items) => items.first().and_then(|first| image_url(Some(first))),
        Value::Object(obj) => {
            let string_at = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
            };
            string_at("url")
                .or_else(|| {
                    obj.get("file")
                        .and_then(|f| f.get("url"))
                        .and_then(Value::as_str)
                        .map(ToString::to_string)
                })
                .or_else(|| string_at("file_url"))
                .or_else(|| string_at("link"))
                .or_else(|| string_at("src"))
                .or_else(|| string_at("raw"))
        }
        _ => None,
    }
}

/// Every URL in a multi-image field.
#[must_use]
pub fn image_urls(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| image_url(Some(item)))
            .collect(),
        Some(Value::String(s)) if s.trim_start().starts_with('[') => {
            match serde_json::from_str::<Value>(s) {
                Ok(parsed) => image_urls(Some(&parsed)),
                Err(_) => Vec::new(),
            }
        }
        other => image_url(other).into_iter().collect(),
    }
}

/// Candidate identifiers referenced by a connection field.
///
/// `id_key` is the connected object's own ID field, which Knack sometimes
/// embeds in connection objects.
#[must_use]
pub fn connection_values(value: Option<&Value>, id_key: &str) -> Vec<String> {
    let mut values = Vec::new();

    match value {
        Some(Value::String(s)) if s.contains('<') && s.contains('>') => {
            let captured = CONNECTION_VALUE
                .captures(s)
                .or_else(|| TAG_CONTENT.captures(s))
                .and_then(|c| c.get(1));
            if let Some(m) = captured {
                push_unique(&mut values, m.as_str());
            }
            push_unique(&mut values, &strip_tags(s));
        }
        Some(Value::String(s)) => push_unique(&mut values, s),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) => {
                        push_unique(&mut values, s);
                        if s.contains('<') {
                            push_unique(&mut values, &strip_tags(s));
                        }
                    }
                    Value::Object(obj) => push_object_ids(&mut values, obj, id_key),
                    _ => {}
                }
            }
        }
        Some(Value::Object(obj)) => push_object_ids(&mut values, obj, id_key),
        _ => {}
    }

    values
}

fn push_object_ids(values: &mut Vec<String>, obj: &serde_json::Map<String, Value>, id_key: &str) {
    for key in ["id", "identifier", id_key] {
        if let Some(v) = text(obj.get(key)) {
            push_unique(values, &v);
        }
    }
}

fn push_unique(values: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() && !values.iter().any(|v| v == candidate) {
        values.push(candidate.to_string());
    }
}

/// Remove HTML tags.
#[must_use]
pub fn strip_tags(s: &str) -> String {
    HTML_TAG.replace_all(s, "").trim().to_string()
}
