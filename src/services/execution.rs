use crate::errors::{NodeError, ToolError};
use crate::services::logger::Logger;
use crate::services::validation::Validation;
use crate::utils::merge::merge_deep;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A binary attachment on an input item. `data` is base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryData {
    #[serde(default)]
    pub data: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl BinaryData {
    pub fn from_bytes(bytes: &[u8], mime_type: &str, file_name: &str) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: Some(mime_type.to_string()),
            file_name: Some(file_name.to_string()),
        }
    }

    pub fn bytes(&self) -> Result<Vec<u8>, ToolError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim().as_bytes())
            .map_err(|_| ToolError::invalid_params("Binary data must be valid base64"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeItem {
    #[serde(default)]
    pub json: Map<String, Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub binary: HashMap<String, BinaryData>,
    /// Per-item parameter values, layered over the node-level ones.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

/// What a node sees of the host while it runs.
pub trait ExecutionContext: Send + Sync {
    fn input_items(&self) -> &[NodeItem];
    fn parameter(&self, name: &str, index: usize) -> Option<Value>;

    fn parameter_or(&self, name: &str, index: usize, default: Value) -> Value {
        self.parameter(name, index).unwrap_or(default)
    }
}

/// Host context decoded from a tool call:
/// `{ "parameters": {...}, "items": [{ "json", "binary", "parameters" }] }`.
#[derive(Debug, Clone)]
pub struct JsonExecution {
    items: Vec<NodeItem>,
    resolved: Vec<Map<String, Value>>,
}

impl JsonExecution {
    pub fn new(parameters: Map<String, Value>, items: Vec<NodeItem>) -> Self {
        let items = if items.is_empty() {
            vec![NodeItem::default()]
        } else {
            items
        };
        let resolved = items
            .iter()
            .map(|item| merge_deep(&parameters, &item.parameters))
            .collect();
        Self { items, resolved }
    }

    pub fn from_args(args: &Value) -> Result<Self, ToolError> {
        let validation = Validation::new();
        let parameters = validation
            .ensure_optional_object(args.get("parameters"), "parameters")?
            .unwrap_or_default();
        let items: Vec<NodeItem> = match args.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|err| {
                ToolError::invalid_params(format!("items must be a list of items: {}", err))
            })?,
        };
        Ok(Self::new(parameters, items))
    }
}

impl ExecutionContext for JsonExecution {
    fn input_items(&self) -> &[NodeItem] {
        &self.items
    }

    fn parameter(&self, name: &str, index: usize) -> Option<Value> {
        self.resolved
            .get(index)
            .and_then(|params| params.get(name))
            .filter(|value| !value.is_null())
            .cloned()
    }
}

/// Typed parameter reads for one item index.
pub struct Parameters<'a> {
    ctx: &'a dyn ExecutionContext,
    index: usize,
    validation: Validation,
}

impl<'a> Parameters<'a> {
    pub fn new(ctx: &'a dyn ExecutionContext, index: usize) -> Self {
        Self {
            ctx,
            index,
            validation: Validation::new(),
        }
    }

    pub fn item(&self) -> Option<&'a NodeItem> {
        self.ctx.input_items().get(self.index)
    }

    fn missing(&self, name: &str) -> ToolError {
        ToolError::invalid_params(format!(
            "Could not get parameter '{}' for item {}",
            name, self.index
        ))
    }

    pub fn value(&self, name: &str) -> Result<Value, ToolError> {
        self.ctx
            .parameter(name, self.index)
            .ok_or_else(|| self.missing(name))
    }

    pub fn value_or(&self, name: &str, default: Value) -> Value {
        self.ctx.parameter_or(name, self.index, default)
    }

    /// Required, non-blank string. Numeric ids are accepted.
    pub fn required_string(&self, name: &str) -> Result<String, ToolError> {
        let value = self.value(name)?;
        self.validation.ensure_string(&value, name)
    }

    /// Optional string; absent means `""`.
    pub fn string(&self, name: &str) -> Result<String, ToolError> {
        self.string_or(name, "")
    }

    pub fn string_or(&self, name: &str, default: &str) -> Result<String, ToolError> {
        match self.ctx.parameter(name, self.index) {
            Some(value) => self.validation.ensure_text(&value, name),
            None => Ok(default.to_string()),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ToolError> {
        match self.ctx.parameter(name, self.index) {
            Some(value) => self.validation.ensure_bool(&value, name),
            None => Ok(default),
        }
    }

    pub fn integer_or(&self, name: &str, default: i64) -> Result<i64, ToolError> {
        match self.ctx.parameter(name, self.index) {
            Some(value) => self.validation.ensure_integer(&value, name),
            None => Ok(default),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<Vec<String>, ToolError> {
        match self.ctx.parameter(name, self.index) {
            Some(value) => self.validation.ensure_string_list(&value, name),
            None => Ok(Vec::new()),
        }
    }

    pub fn binary(&self, property: &str) -> Result<&'a BinaryData, ToolError> {
        self.item()
            .and_then(|item| item.binary.get(property))
            .ok_or_else(|| {
                ToolError::invalid_params(format!(
                    "Item {} has no binary property '{}'",
                    self.index, property
                ))
            })
    }
}

/// One remote node: turns the parameters of one input item into a response.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute_item(
        &self,
        ctx: &dyn ExecutionContext,
        index: usize,
    ) -> Result<Value, NodeError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub index: usize,
    pub items: Vec<Map<String, Value>>,
    #[serde(skip)]
    pub failed: bool,
}

/// Outcomes of one batch, one per input item, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutput {
    pub outcomes: Vec<ItemOutcome>,
}

impl NodeOutput {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed).count()
    }

    /// Flat host records, each paired with its originating input index.
    pub fn to_host_items(&self) -> Vec<Value> {
        self.outcomes
            .iter()
            .flat_map(|outcome| {
                outcome.items.iter().map(move |json| {
                    serde_json::json!({
                        "json": json,
                        "pairedItem": {"item": outcome.index},
                    })
                })
            })
            .collect()
    }
}

fn wrap_scalar(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("value".to_string(), value);
    map
}

/// Arrays fan out to one record per element, objects pass through, other
/// scalars are wrapped as `{ "value": ... }` and an empty body becomes `{}`.
pub fn normalize_response(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Null => vec![Map::new()],
        Value::Object(map) => vec![map],
        Value::Array(entries) => entries
            .into_iter()
            .map(|entry| match entry {
                Value::Object(map) => map,
                other => wrap_scalar(other),
            })
            .collect(),
        other => vec![wrap_scalar(other)],
    }
}

pub fn error_record(message: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("error".to_string(), Value::String(message.to_string()));
    map
}

/// Runs `node` over every input item in order, one request at a time. A
/// failing item yields `{ "error": ... }` and the batch carries on.
pub async fn execute_batch(
    node: &dyn Node,
    ctx: &dyn ExecutionContext,
    logger: &Logger,
) -> NodeOutput {
    let total = ctx.input_items().len();
    let mut outcomes = Vec::with_capacity(total);
    for index in 0..total {
        let outcome = match node.execute_item(ctx, index).await {
            Ok(response) => ItemOutcome {
                index,
                items: normalize_response(response),
                failed: false,
            },
            Err(err) => {
                let message = err.item_message();
                logger.warn(
                    "Item failed",
                    Some(&serde_json::json!({"node": node.name(), "item": index, "error": message})),
                );
                ItemOutcome {
                    index,
                    items: vec![error_record(&message)],
                    failed: true,
                }
            }
        };
        outcomes.push(outcome);
    }
    let output = NodeOutput { outcomes };
    logger.info(
        "Batch finished",
        Some(&serde_json::json!({
            "node": node.name(),
            "items": output.len(),
            "failed": output.failures(),
        })),
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoNode;

    #[async_trait]
    impl Node for EchoNode {
        fn name(&self) -> &'static str {
            "Echo"
        }

        async fn execute_item(
            &self,
            ctx: &dyn ExecutionContext,
            index: usize,
        ) -> Result<Value, NodeError> {
            let params = Parameters::new(ctx, index);
            let mode = params.required_string("mode")?;
            match mode.as_str() {
                "list" => Ok(json!([{"n": 1}, {"n": 2}])),
                "empty" => Ok(Value::Null),
                _ => Ok(json!({"mode": mode})),
            }
        }
    }

    fn ctx(items: Value) -> JsonExecution {
        JsonExecution::from_args(&json!({"parameters": {"mode": "one"}, "items": items}))
            .expect("context")
    }

    #[tokio::test]
    async fn batch_preserves_length_and_order() {
        let ctx = ctx(json!([
            {"json": {}},
            {"json": {}, "parameters": {"mode": "list"}},
            {"json": {}, "parameters": {"mode": " "}},
            {"json": {}, "parameters": {"mode": "empty"}},
        ]));
        let output = execute_batch(&EchoNode, &ctx, &Logger::new("test")).await;

        assert_eq!(output.len(), 4);
        for (i, outcome) in output.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
        }
        assert_eq!(output.outcomes[0].items, vec![json!({"mode": "one"}).as_object().cloned().unwrap_or_default()]);
        assert_eq!(output.outcomes[1].items.len(), 2);
        assert!(output.outcomes[2].failed);
        assert_eq!(
            output.outcomes[2].items[0]["error"],
            "mode must be a non-empty string"
        );
        assert_eq!(output.outcomes[3].items, vec![Map::new()]);
        assert_eq!(output.failures(), 1);
    }

    #[tokio::test]
    async fn host_items_carry_paired_index() {
        let ctx = ctx(json!([{"json": {}, "parameters": {"mode": "list"}}, {"json": {}}]));
        let output = execute_batch(&EchoNode, &ctx, &Logger::new("test")).await;
        let flat = output.to_host_items();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0]["pairedItem"]["item"], 0);
        assert_eq!(flat[1]["pairedItem"]["item"], 0);
        assert_eq!(flat[2]["pairedItem"]["item"], 1);
        assert_eq!(flat[2]["json"]["mode"], "one");
    }

    #[test]
    fn absent_items_run_once() {
        let ctx = JsonExecution::from_args(&json!({"parameters": {"operation": "getIntegrations"}}))
            .expect("context");
        assert_eq!(ctx.input_items().len(), 1);
        assert_eq!(ctx.parameter("operation", 0), Some(json!("getIntegrations")));
        assert_eq!(ctx.parameter("operation", 1), None);
    }

    #[test]
    fn normalize_wraps_scalars() {
        assert_eq!(normalize_response(json!("ok"))[0]["value"], "ok");
        assert_eq!(normalize_response(json!([1, {"a": 1}]))[0]["value"], 1);
        assert_eq!(normalize_response(json!([])).len(), 0);
    }

    #[test]
    fn binary_round_trips_through_base64() {
        let data = BinaryData::from_bytes(b"hello", "text/plain", "a.txt");
        assert_eq!(data.bytes().expect("decode"), b"hello".to_vec());
        let broken = BinaryData {
            data: "***".to_string(),
            ..Default::default()
        };
        assert!(broken.bytes().is_err());
    }
}
