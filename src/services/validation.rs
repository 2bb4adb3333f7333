use crate::errors::ToolError;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    /// Trimmed, non-blank text. Numeric values are rendered, so ids such as
    /// `1234` read the same as `"1234"`.
    pub fn ensure_string(&self, value: &Value, label: &str) -> Result<String, ToolError> {
        let text = self.ensure_text(value, label)?;
        let normalized = text.trim();
        if normalized.is_empty() {
            return Err(ToolError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(normalized.to_string())
    }

    /// Lenient text read: `null` becomes `""`, numbers and booleans are
    /// rendered, containers are rejected.
    pub fn ensure_text(&self, value: &Value, label: &str) -> Result<String, ToolError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(text) => Ok(text.clone()),
            Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
            _ => Err(ToolError::invalid_params(format!("{} must be a string", label))),
        }
    }

    pub fn ensure_bool(&self, value: &Value, label: &str) -> Result<bool, ToolError> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::String(text) => match text.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" | "" => Ok(false),
                _ => Err(ToolError::invalid_params(format!("{} must be a boolean", label))),
            },
            _ => Err(ToolError::invalid_params(format!("{} must be a boolean", label))),
        }
    }

    pub fn ensure_integer(&self, value: &Value, label: &str) -> Result<i64, ToolError> {
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| fits_i64(*f)).map(|f| f as i64))
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an integer", label)))
    }

    /// Accepts a list of strings or a single string; empty entries are dropped.
    pub fn ensure_string_list(&self, value: &Value, label: &str) -> Result<Vec<String>, ToolError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::String(text) if text.is_empty() => Ok(Vec::new()),
            Value::String(text) => Ok(vec![text.clone()]),
            Value::Array(items) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| self.ensure_text(item, label))
                .filter(|item| !matches!(item, Ok(text) if text.is_empty()))
                .collect(),
            _ => Err(ToolError::invalid_params(format!(
                "{} must be a list of strings",
                label
            ))),
        }
    }

    pub fn ensure_object(
        &self,
        value: &Value,
        label: &str,
    ) -> Result<Map<String, Value>, ToolError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| ToolError::invalid_params(format!("{} must be an object", label)))
    }

    pub fn ensure_optional_object(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<Map<String, Value>>, ToolError> {
        match value {
            None => Ok(None),
            Some(val) if val.is_null() => Ok(None),
            Some(val) => self.ensure_object(val, label).map(Some),
        }
    }
}

/// Whole floats inside the `i64` range; `2^63` itself is excluded.
fn fits_i64(value: f64) -> bool {
    value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Validation;
    use serde_json::json;

    #[test]
    fn integers_accept_numeric_strings() {
        let v = Validation::new();
        assert_eq!(v.ensure_integer(&json!("12"), "week").ok(), Some(12));
        assert_eq!(v.ensure_integer(&json!(3.0), "week").ok(), Some(3));
        assert!(v.ensure_integer(&json!(3.5), "week").is_err());
    }

    #[test]
    fn integers_outside_i64_are_rejected() {
        let v = Validation::new();
        assert!(v.ensure_integer(&json!(1e30), "week").is_err());
        assert!(v.ensure_integer(&json!(-1e30), "week").is_err());
        assert!(v.ensure_integer(&json!(9223372036854775808.0), "week").is_err());
        assert_eq!(v.ensure_integer(&json!(-4.0), "week").ok(), Some(-4));
    }

    #[test]
    fn strings_accept_numeric_ids() {
        let v = Validation::new();
        assert_eq!(v.ensure_string(&json!(1234), "postId").ok(), Some("1234".to_string()));
        assert_eq!(v.ensure_string(&json!(" abc "), "postId").ok(), Some("abc".to_string()));
        let err = v.ensure_string(&json!("  "), "postId").err().expect("blank");
        assert_eq!(err.message, "postId must be a non-empty string");
        assert!(v.ensure_string(&json!(null), "postId").is_err());
        assert!(v.ensure_string(&json!({"id": 1}), "postId").is_err());
    }

    #[test]
    fn string_lists_drop_empty_entries() {
        let v = Validation::new();
        let urls = v
            .ensure_string_list(&json!(["https://a.example", "", null]), "urls")
            .expect("list");
        assert_eq!(urls, vec!["https://a.example".to_string()]);
        assert!(v.ensure_string_list(&json!({"a": 1}), "urls").is_err());
    }

    #[test]
    fn text_renders_scalars() {
        let v = Validation::new();
        assert_eq!(v.ensure_text(&json!(null), "x").ok(), Some(String::new()));
        assert_eq!(v.ensure_text(&json!(42), "x").ok(), Some("42".to_string()));
        assert!(v.ensure_text(&json!([1]), "x").is_err());
    }

    #[test]
    fn booleans_accept_common_strings() {
        let v = Validation::new();
        assert_eq!(v.ensure_bool(&json!("true"), "shortLink").ok(), Some(true));
        assert_eq!(v.ensure_bool(&json!(false), "shortLink").ok(), Some(false));
        assert!(v.ensure_bool(&json!(1), "shortLink").is_err());
    }
}
