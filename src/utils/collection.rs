//! Repeated parameter groups.
//!
//! The host delivers a repeated group as `{ "<group>": [ {...}, ... ] }`.
//! [`read_group`] lifts that shape into typed records and [`write_group`]
//! puts records back into it. [`flatten_pairs`] collapses key/value records
//! into one flat map where later keys overwrite earlier ones.

use crate::errors::ToolError;
use crate::services::validation::Validation;
use serde_json::{Map, Value};

pub trait GroupRecord: Sized {
    fn from_record(record: &Map<String, Value>, validation: &Validation) -> Result<Self, ToolError>;
    fn to_record(&self) -> Map<String, Value>;
}

/// Entries of `group` inside `value`. A missing group (or an empty
/// collection object) yields no entries.
pub fn group_entries(value: &Value, group: &str) -> Result<Vec<Map<String, Value>>, ToolError> {
    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => match map.get(group) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(entries) => entries,
        },
        _ => {
            return Err(ToolError::invalid_params(format!(
                "Expected a collection with a '{}' list",
                group
            )))
        }
    };
    let list = entries.as_array().ok_or_else(|| {
        ToolError::invalid_params(format!("'{}' must be a list", group))
    })?;
    list.iter()
        .map(|entry| {
            entry.as_object().cloned().ok_or_else(|| {
                ToolError::invalid_params(format!("Every '{}' entry must be an object", group))
            })
        })
        .collect()
}

pub fn read_group<T: GroupRecord>(value: &Value, group: &str) -> Result<Vec<T>, ToolError> {
    let validation = Validation::new();
    group_entries(value, group)?
        .iter()
        .map(|record| T::from_record(record, &validation))
        .collect()
}

pub fn write_group<T: GroupRecord>(records: &[T], group: &str) -> Value {
    let entries: Vec<Value> = records
        .iter()
        .map(|record| Value::Object(record.to_record()))
        .collect();
    let mut map = Map::new();
    map.insert(group.to_string(), Value::Array(entries));
    Value::Object(map)
}

/// Reads `field` of a record as text; a missing field is `""`.
pub fn record_text(
    record: &Map<String, Value>,
    field: &str,
    validation: &Validation,
) -> Result<String, ToolError> {
    validation.ensure_text(record.get(field).unwrap_or(&Value::Null), field)
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl GroupRecord for KeyValue {
    fn from_record(
        record: &Map<String, Value>,
        validation: &Validation,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            key: record_text(record, "key", validation)?,
            value: record.get("value").cloned().unwrap_or(Value::String(String::new())),
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("key".to_string(), Value::String(self.key.clone()));
        map.insert("value".to_string(), self.value.clone());
        map
    }
}

pub fn flatten_pairs<I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = KeyValue>,
{
    let mut out = Map::new();
    for pair in pairs {
        out.insert(pair.key, pair.value);
    }
    out
}
