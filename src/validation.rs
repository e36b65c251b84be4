//! Input validation for command payloads
//!
//! Structural limits applied to every payload before a handler sees it, plus
//! typed field accessors that turn missing or malformed fields into
//! [`PipelineError::InvalidInput`].

use crate::error::{PipelineError, PipelineResult};
use serde_json::{Map, Value};

/// Maximum nesting depth for JSON objects/arrays
const MAX_JSON_DEPTH: usize = 10;

/// Maximum number of keys in a JSON object
const MAX_JSON_KEYS: usize = 1000;

/// Maximum string length for JSON string values
const MAX_JSON_STRING_LENGTH: usize = 10000;

/// Validates a payload for depth and size constraints.
///
/// Array length is not limited here; binary fields such as image data are
/// bounded by the handler that owns them.
pub fn validate_payload(payload: &Map<String, Value>) -> PipelineResult<()> {
    if payload.len() > MAX_JSON_KEYS {
        return Err(PipelineError::invalid_input(format!(
            "Too many payload fields: {} (max: {MAX_JSON_KEYS})",
            payload.len()
        )));
    }
    for (key, value) in payload {
        validate_key(key)?;
        validate_json_depth(value, 1)?;
    }
    Ok(())
}

fn validate_key(key: &str) -> PipelineResult<()> {
    if key.len() > MAX_JSON_STRING_LENGTH {
        return Err(PipelineError::invalid_input(format!(
            "Field name too long: {} chars (max: {MAX_JSON_STRING_LENGTH})",
            key.len()
        )));
    }
    Ok(())
}

/// Validates JSON depth recursively
fn validate_json_depth(value: &Value, current_depth: usize) -> PipelineResult<()> {
    if current_depth > MAX_JSON_DEPTH {
        return Err(PipelineError::invalid_input(format!(
            "Payload nesting too deep: {current_depth} (max: {MAX_JSON_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_JSON_KEYS {
                return Err(PipelineError::invalid_input(format!(
                    "Too many JSON keys: {} (max: {MAX_JSON_KEYS})",
                    map.len()
                )));
            }
            for (key, val) in map {
                validate_key(key)?;
                validate_json_depth(val, current_depth + 1)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                validate_json_depth(item, current_depth + 1)?;
            }
        }
        Value::String(s) => {
            if s.len() > MAX_JSON_STRING_LENGTH {
                return Err(PipelineError::invalid_input(format!(
                    "Text too long: {} chars (max: {MAX_JSON_STRING_LENGTH})",
                    s.len()
                )));
            }
        }
        _ => {}
    }

    Ok(())
}

/// Non-blank string field, trimmed
pub fn required_str<'a>(payload: &'a Map<String, Value>, field: &str) -> PipelineResult<&'a str> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(PipelineError::invalid_input(format!("{field} is required")))
        }
        Some(_) => Err(PipelineError::invalid_input(format!("{field} must be text"))),
    }
}

/// String field kept verbatim, for secrets where whitespace is significant
pub fn required_secret<'a>(payload: &'a Map<String, Value>, field: &str) -> PipelineResult<&'a str> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(PipelineError::invalid_input(format!("{field} is required")))
        }
        Some(_) => Err(PipelineError::invalid_input(format!("{field} must be text"))),
    }
}

pub fn optional_str<'a>(payload: &'a Map<String, Value>, field: &str) -> PipelineResult<Option<&'a str>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(_) => Err(PipelineError::invalid_input(format!("{field} must be text"))),
    }
}

/// Byte array field encoded as a JSON array of integers in 0..=255.
///
/// A missing field yields an empty vector so callers can report emptiness in
/// their own terms.
pub fn bytes_field(payload: &Map<String, Value>, field: &str) -> PipelineResult<Vec<u8>> {
    let items = match payload.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(PipelineError::invalid_input(format!(
                "{field} must be an array of bytes"
            )))
        }
    };

    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| {
                    PipelineError::invalid_input(format!("{field} must be an array of bytes"))
                })
        })
        .collect()
}

/// Character-count bounds, inclusive
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> PipelineResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(PipelineError::invalid_input(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> PipelineResult<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PipelineError::invalid_input("Invalid email address"))
    }
}
