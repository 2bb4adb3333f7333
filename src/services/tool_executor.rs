use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::limits::LOG_STRING_LENGTH;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use crate::utils::redact::redact_object;
use crate::utils::tool_errors::unknown_tool_error;

use serde_json::Value;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

/// Routes a tool call to its handler and wraps the result in the
/// `{ ok, result, meta }` envelope.
#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        let started_at = chrono::Utc::now().timestamp_millis();
        let handler = self
            .handlers
            .get(tool)
            .ok_or_else(|| unknown_tool_error(tool, &self.tool_names()))?;

        let trace_id = args
            .get("trace_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let action = args.get("action").cloned().unwrap_or(Value::Null);

        self.logger.debug(
            "Tool call",
            Some(&serde_json::json!({
                "tool": tool,
                "trace_id": trace_id,
                "args": redact_object(&args, LOG_STRING_LENGTH),
            })),
        );

        let result = handler.handle(args).await?;
        let duration_ms = chrono::Utc::now().timestamp_millis() - started_at;
        self.logger.info(
            "Tool call finished",
            Some(&serde_json::json!({
                "tool": tool,
                "action": action,
                "trace_id": trace_id,
                "duration_ms": duration_ms,
            })),
        );

        Ok(serde_json::json!({
            "ok": true,
            "result": result,
            "meta": {
                "tool": tool,
                "action": action,
                "trace_id": trace_id,
                "duration_ms": duration_ms,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn handle(&self, args: Value) -> Result<Value, ToolError> {
            Ok(json!({"echo": args.get("action").cloned()}))
        }
    }

    fn executor() -> ToolExecutor {
        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("postiz".to_string(), Arc::new(Echo));
        ToolExecutor::new(Logger::new("test"), handlers)
    }

    #[tokio::test]
    async fn wraps_result_with_meta() {
        let payload = executor()
            .execute("postiz", json!({"action": "execute", "trace_id": "t-1"}))
            .await
            .expect("payload");
        assert_eq!(payload["ok"], true);
        assert_eq!(payload["result"]["echo"], "execute");
        assert_eq!(payload["meta"]["tool"], "postiz");
        assert_eq!(payload["meta"]["trace_id"], "t-1");
    }

    #[tokio::test]
    async fn unknown_tool_lists_known_tools() {
        let err = executor()
            .execute("Postiz", json!({}))
            .await
            .expect_err("unknown tool");
        assert_eq!(err.message, "Unknown tool: Postiz");
        assert_eq!(err.hint.as_deref(), Some("Did you mean: postiz? Use one of: postiz."));
    }
}
