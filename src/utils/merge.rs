use serde_json::{Map, Value};

/// Deep-merges `overrides` onto `base`. Nested objects merge key by key;
/// anything else (arrays included) is replaced wholesale. A `null` override
/// keeps the base value.
pub fn merge_deep(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        if value.is_null() {
            continue;
        }
        let next = match (merged.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(merge_deep(existing, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
