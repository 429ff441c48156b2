//! Shared utilities for tool handlers.

use serde_json::{Map, Value};

use crate::protocol::value_kind;
use crate::{AppError, Result};

/// Fetch a required string argument.
///
/// # Errors
///
/// Returns [`AppError::InvalidParams`] when `key` is missing or not a string.
pub fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match arguments.get(key) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(AppError::InvalidParams(format!(
            "argument {key} must be a string, found {}",
            value_kind(other)
        ))),
        None => Err(AppError::InvalidParams(format!(
            "missing required argument: {key}"
        ))),
    }
}

/// Truncate `text` to at most `max_len` bytes, breaking at the nearest
/// preceding char boundary so the result is always valid UTF-8.
/// Appends `"..."` when truncation occurs and `max_len >= 3`.
#[must_use]
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_owned();
    }

    if max_len < 3 {
        let boundary = text
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len)
            .last()
            .unwrap_or(0);
        return text[..boundary].to_owned();
    }

    let limit = max_len.saturating_sub(3);
    let boundary = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= limit)
        .last()
        .unwrap_or(0);

    format!("{}...", &text[..boundary])
}
