use crate::errors::{ApiError, NodeError, ToolError};
use crate::managers::gateway::ApiGateway;
use crate::services::execution::{execute_batch, ExecutionContext, JsonExecution, Node, Parameters};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::tool_errors::unknown_operation_error;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowchiefOperationKind {
    GetWorkflows,
    StartWorkflow,
}

impl GrowchiefOperationKind {
    pub const ALL: [GrowchiefOperationKind; 2] = [
        GrowchiefOperationKind::GetWorkflows,
        GrowchiefOperationKind::StartWorkflow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GrowchiefOperationKind::GetWorkflows => "getWorkflows",
            GrowchiefOperationKind::StartWorkflow => "startWorkflow",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// Enrichment data for a workflow run. Empty fields stay off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

fn present(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

impl Enrichment {
    fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        Ok(Self {
            organization_name: present(params.string("organizationName")?),
            first_name: present(params.string("firstName")?),
            last_name: present(params.string("lastName")?),
            email: present(params.string("email")?),
            urls: params.string_list("urls")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.organization_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.urls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrowchiefOperation {
    GetWorkflows,
    StartWorkflow {
        workflow_id: String,
        enrichment: Enrichment,
    },
}

impl GrowchiefOperation {
    pub fn from_parameters(params: &Parameters<'_>) -> Result<Self, ToolError> {
        let name = params.string_or("operation", GrowchiefOperationKind::GetWorkflows.as_str())?;
        let kind = GrowchiefOperationKind::lookup(&name).ok_or_else(|| {
            unknown_operation_error("Growchief", &name, &GrowchiefOperationKind::names())
        })?;
        match kind {
            GrowchiefOperationKind::GetWorkflows => Ok(GrowchiefOperation::GetWorkflows),
            GrowchiefOperationKind::StartWorkflow => {
                let workflow_id = params.required_string("workflowId")?;
                let enrichment = Enrichment::from_parameters(params)?;
                if enrichment.is_empty() {
                    return Err(ToolError::invalid_params(
                        "Provide an organization, a name, an email or at least one URL",
                    )
                    .with_hint(
                        "Set organizationName, firstName, lastName, email or urls.",
                    ));
                }
                Ok(GrowchiefOperation::StartWorkflow {
                    workflow_id,
                    enrichment,
                })
            }
        }
    }

    pub fn kind(&self) -> GrowchiefOperationKind {
        match self {
            GrowchiefOperation::GetWorkflows => GrowchiefOperationKind::GetWorkflows,
            GrowchiefOperation::StartWorkflow { .. } => GrowchiefOperationKind::StartWorkflow,
        }
    }
}

/// One selectable entry offered to the host for a dynamic parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub name: String,
    pub value: String,
    pub description: String,
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl OptionEntry {
    fn from_workflow(workflow: &Value) -> Self {
        let id = scalar_text(workflow.get("id"));
        let description = scalar_text(workflow.get("description"));
        Self {
            name: scalar_text(workflow.get("name")),
            description: if description.is_empty() {
                format!("Workflow ID: {}", id)
            } else {
                description
            },
            value: id,
        }
    }
}

#[derive(Clone)]
pub struct GrowchiefNode {
    logger: Logger,
    gateway: ApiGateway,
}

impl GrowchiefNode {
    pub fn new(logger: Logger, gateway: ApiGateway) -> Self {
        Self {
            logger: logger.child("growchief"),
            gateway,
        }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub async fn run(&self, operation: GrowchiefOperation) -> Result<Value, ApiError> {
        match operation {
            GrowchiefOperation::GetWorkflows => self.gateway.get("/workflows").await,
            GrowchiefOperation::StartWorkflow {
                workflow_id,
                enrichment,
            } => {
                let body = serde_json::to_value(&enrichment).map_err(|err| {
                    ApiError::new("Growchief", format!("Failed to encode request body: {}", err))
                })?;
                self.gateway
                    .post(&format!("/workflow/{}", workflow_id), body)
                    .await
            }
        }
    }

    pub async fn load_workflow_options(&self) -> Result<Vec<OptionEntry>, ApiError> {
        let response = self.gateway.get("/workflows").await?;
        let workflows = response.as_array().ok_or_else(|| {
            ApiError::new("Growchief", "Expected a list of workflows")
        })?;
        Ok(workflows.iter().map(OptionEntry::from_workflow).collect())
    }

    /// Option list for the workflow picker; any failure yields no options.
    pub async fn workflow_options(&self) -> Vec<OptionEntry> {
        match self.load_workflow_options().await {
            Ok(options) => options,
            Err(err) => {
                self.logger.warn(
                    "Workflow options unavailable",
                    Some(&json!({"error": err.user_message()})),
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Node for GrowchiefNode {
    fn name(&self) -> &'static str {
        "Growchief"
    }

    async fn execute_item(
        &self,
        ctx: &dyn ExecutionContext,
        index: usize,
    ) -> Result<Value, NodeError> {
        let params = Parameters::new(ctx, index);
        let operation = GrowchiefOperation::from_parameters(&params)?;
        self.logger.debug(
            "Running operation",
            Some(&json!({"operation": operation.kind().as_str(), "item": index})),
        );
        Ok(self.run(operation).await?)
    }
}

#[async_trait]
impl ToolHandler for GrowchiefNode {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        match args.get("action").and_then(|v| v.as_str()).unwrap_or("execute") {
            "execute" => {
                let ctx = JsonExecution::from_args(&args)?;
                let output = execute_batch(self, &ctx, &self.logger).await;
                Ok(json!({
                    "items": output.to_host_items(),
                    "outcomes": output.outcomes,
                }))
            }
            "load_options" => {
                let method = args
                    .get("method")
                    .and_then(|v| v.as_str())
                    .unwrap_or("getWorkflows");
                if method != "getWorkflows" {
                    return Err(ToolError::invalid_params(format!(
                        "Unknown options method: {}",
                        method
                    ))
                    .with_hint("Use getWorkflows."));
                }
                Ok(json!({"options": self.workflow_options().await}))
            }
            "test_credentials" => {
                let result = self.gateway.test_credentials().await;
                Ok(serde_json::to_value(result).unwrap_or(Value::Null))
            }
            other => Err(ToolError::invalid_params(format!(
                "Unknown growchief action: {}",
                other
            ))
            .with_hint("Use one of: execute, load_options, test_credentials.")),
        }
    }
}
