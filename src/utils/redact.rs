use crate::utils::text::truncate_utf8_prefix;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

const REDACTED: &str = "[REDACTED]";

static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "apikey",
        "api_key",
        "authorization",
        "password",
        "secret",
        "token",
        "x-api-key",
    ]
    .into_iter()
    .collect()
});

static INLINE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~+/=-]{8,})").expect("bearer redaction regex"),
            "$1 [REDACTED]",
        ),
        (
            Regex::new(r#"(?i)\b(api[_-]?key|authorization|token)\b\s*([:=])\s*([^\s"',}]+)"#)
                .expect("key-value redaction regex"),
            "$1$2[REDACTED]",
        ),
    ]
});

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    if normalized.is_empty() {
        return false;
    }
    SENSITIVE_KEYS.contains(normalized.as_str())
        || normalized.contains("secret")
        || normalized.contains("token")
}

pub fn redact_text(value: &str, max_length: usize) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    if out.len() > max_length {
        return format!("{}...", truncate_utf8_prefix(&out, max_length));
    }
    out
}

/// Copy of `value` with secret-looking keys masked and long strings cut.
pub fn redact_object(value: &Value, max_length: usize) -> Value {
    match value {
        Value::String(text) => Value::String(redact_text(text, max_length)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| redact_object(item, max_length))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, entry)| {
                    let masked = if is_sensitive_key(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_object(entry, max_length)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
