use crate::domain::LogLevel;
use serde_json::Value;

const SEPARATOR: &str = " ";

/// Strings pass through; everything else is pretty-printed JSON.
pub fn format_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn format_message(message: &str, fields: &[Value]) -> String {
    let mut parts = Vec::with_capacity(fields.len() + 1);
    if !message.is_empty() || fields.is_empty() {
        parts.push(message.to_string());
    }
    parts.extend(fields.iter().map(format_field));
    parts.join(SEPARATOR)
}

/// Final form handed to the sink: level marker, then the formatted body.
pub fn render(level: LogLevel, body: &str) -> String {
    format!("{}{SEPARATOR}{body}", level.marker())
}
