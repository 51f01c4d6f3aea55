//! Message extraction from loosely shaped server payloads.

use serde_json::Value;

/// Render a field value as a user-facing message.
///
/// Strings are taken verbatim, arrays yield their first renderable element,
/// numbers and objects are serialised. Null, booleans and empty strings carry
/// no message.
pub fn message_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::String(_) | Value::Null | Value::Bool(_) => None,
        Value::Array(items) => items.iter().find_map(message_of),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// First field of `fields` (in order) present on `value` with a message.
pub fn first_message(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| value.get(*f))
        .find_map(message_of)
}
