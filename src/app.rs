use crate::errors::ToolError;
use crate::managers::gateway::ApiGateway;
use crate::managers::growchief::GrowchiefNode;
use crate::managers::postiz::PostizNode;
use crate::mcp::catalog::tool_catalog;
use crate::services::credentials::{CredentialService, CredentialSource, Provider};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::transport::{HttpTransport, ReqwestTransport};
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
    pub postiz: Arc<PostizNode>,
    pub growchief: Arc<GrowchiefNode>,
}

impl App {
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json needs a handler.")
            .with_details(serde_json::json!({ "missing_tools": missing })))
    }

    /// Wires both nodes over the given credential source and transport.
    pub fn with_parts(
        logger: Logger,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ToolError> {
        let postiz = Arc::new(PostizNode::new(
            logger.clone(),
            ApiGateway::new(
                Provider::POSTIZ,
                logger.clone(),
                credentials.clone(),
                transport.clone(),
            ),
        ));
        let growchief = Arc::new(GrowchiefNode::new(
            logger.clone(),
            ApiGateway::new(Provider::GROWCHIEF, logger.clone(), credentials, transport),
        ));

        let mut handlers: HashMap<String, Arc<dyn ToolHandler>> = HashMap::new();
        handlers.insert("postiz".to_string(), postiz.clone());
        handlers.insert("growchief".to_string(), growchief.clone());
        Self::validate_tool_wiring(&handlers)?;

        Ok(Self {
            tool_executor: Arc::new(ToolExecutor::new(logger.clone(), handlers)),
            logger,
            postiz,
            growchief,
        })
    }

    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("saas-nodes");
        let credentials = Arc::new(CredentialService::new(logger.clone())?);
        let transport = Arc::new(ReqwestTransport::new(logger.clone())?);
        Self::with_parts(logger, credentials, transport)
    }

    pub fn gateway_for(&self, provider: &Provider) -> &ApiGateway {
        if *provider == Provider::GROWCHIEF {
            self.growchief.gateway()
        } else {
            self.postiz.gateway()
        }
    }
}
