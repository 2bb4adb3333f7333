//! The authenticated request gateway shared by every operation of one
//! remote API.
//!
//! A call resolves credentials for the provider, assembles a fresh
//! [`RequestDescriptor`] (`host + api_prefix`, method, path, body, query),
//! drops an empty query entirely, applies the caller's override last, and
//! performs exactly one authenticated request. Any failure comes back as an
//! [`ApiError`] attributed to the node; status codes are not interpreted.

use crate::errors::ApiError;
use crate::services::credentials::{CredentialSource, Credentials, Provider};
use crate::services::logger::Logger;
use crate::services::request::{HttpMethod, Query, RequestBody, RequestDescriptor, RequestOverride};
use crate::services::transport::HttpTransport;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTestResult {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct ApiGateway {
    provider: Provider,
    logger: Logger,
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn HttpTransport>,
}

impl ApiGateway {
    pub fn new(
        provider: Provider,
        logger: Logger,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            provider,
            logger: logger.child(&format!("gateway:{}", provider.node.to_lowercase())),
            credentials,
            transport,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn build_descriptor(
        &self,
        credentials: &Credentials,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
        query: Query,
        request_override: Option<RequestOverride>,
    ) -> RequestDescriptor {
        let descriptor = RequestDescriptor {
            base_url: self.provider.base_url(credentials),
            method,
            path: path.to_string(),
            body,
            query: if query.is_empty() { None } else { Some(query) },
        };
        match request_override {
            Some(request_override) => request_override.apply(descriptor),
            None => descriptor,
        }
    }

    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
        query: Query,
        request_override: Option<RequestOverride>,
    ) -> Result<Value, ApiError> {
        let credentials = self
            .credentials
            .get_credentials(&self.provider)
            .map_err(|err| ApiError::from_credentials(self.provider.node, err))?;
        let descriptor =
            self.build_descriptor(&credentials, method, path, body, query, request_override);
        let summary = descriptor.summary();
        self.logger.debug("API request", Some(&summary));

        match self
            .transport
            .perform_authenticated(&self.provider, &credentials, descriptor)
            .await
        {
            Ok(value) => Ok(value),
            Err(err) => {
                let api_error = ApiError::from_transport(self.provider.node, err);
                self.logger.warn(
                    "API request failed",
                    Some(&serde_json::json!({
                        "method": method.as_str(),
                        "path": path,
                        "http_code": api_error.http_code,
                        "message": api_error.user_message(),
                    })),
                );
                Err(api_error)
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.call(HttpMethod::Get, path, RequestBody::empty(), Query::new(), None)
            .await
    }

    pub async fn get_with_query(&self, path: &str, query: Query) -> Result<Value, ApiError> {
        self.call(HttpMethod::Get, path, RequestBody::empty(), query, None)
            .await
    }

    pub async fn post(&self, path: &str, body: impl Into<RequestBody>) -> Result<Value, ApiError> {
        self.call(HttpMethod::Post, path, body.into(), Query::new(), None)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.call(HttpMethod::Delete, path, RequestBody::empty(), Query::new(), None)
            .await
    }

    /// Pings the provider's well-known path on the configured host. Only
    /// transport success counts; the body is ignored.
    pub async fn test_credentials(&self) -> CredentialTestResult {
        let credentials = match self.credentials.get_credentials(&self.provider) {
            Ok(credentials) => credentials,
            Err(err) => {
                return CredentialTestResult {
                    ok: false,
                    message: err.to_string(),
                }
            }
        };
        let descriptor = RequestDescriptor {
            base_url: credentials.host.clone(),
            method: HttpMethod::Get,
            path: self.provider.test_path.to_string(),
            body: RequestBody::empty(),
            query: None,
        };
        match self
            .transport
            .perform_authenticated(&self.provider, &credentials, descriptor)
            .await
        {
            Ok(_) => CredentialTestResult {
                ok: true,
                message: "Connection successful".to_string(),
            },
            Err(err) => {
                let api_error = ApiError::from_transport(self.provider.node, err);
                self.logger.warn(
                    "Credential test failed",
                    Some(&serde_json::json!({"message": api_error.user_message()})),
                );
                CredentialTestResult {
                    ok: false,
                    message: api_error.user_message().to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::services::credentials::StaticCredentials;
    use crate::services::transport::fake::RecordingTransport;
    use serde_json::json;

    fn gateway(transport: Arc<RecordingTransport>) -> ApiGateway {
        let credentials = StaticCredentials::new()
            .with(&Provider::POSTIZ, Credentials::new("pk_1", "https://api.postiz.com"));
        ApiGateway::new(
            Provider::POSTIZ,
            Logger::new("test"),
            Arc::new(credentials),
            transport,
        )
    }

    #[tokio::test]
    async fn empty_query_is_omitted() {
        let transport = Arc::new(RecordingTransport::new());
        gateway(transport.clone()).get("/integrations").await.expect("ok");
        let call = transport.last();
        assert_eq!(call.request.query, None);
        assert_eq!(call.request.base_url, "https://api.postiz.com/public/v1");
        assert_eq!(call.request.path, "/integrations");
        assert_eq!(call.api_key, "pk_1");
        assert_eq!(call.provider, "postizApi");
    }

    #[tokio::test]
    async fn populated_query_passes_through_unchanged() {
        let transport = Arc::new(RecordingTransport::new());
        let query = json!({"week": 2, "display": "week"}).as_object().cloned().unwrap_or_default();
        gateway(transport.clone())
            .get_with_query("/posts", query.clone())
            .await
            .expect("ok");
        assert_eq!(transport.last().request.query, Some(query));
    }

    #[tokio::test]
    async fn override_is_applied_last() {
        let transport = Arc::new(RecordingTransport::new());
        let request_override = RequestOverride {
            path: Some("/other".to_string()),
            body: Some(RequestBody::Json(json!({"replaced": true}))),
            ..Default::default()
        };
        gateway(transport.clone())
            .call(
                HttpMethod::Post,
                "/posts",
                RequestBody::Json(json!({"original": true})),
                Query::new(),
                Some(request_override),
            )
            .await
            .expect("ok");
        let call = transport.last();
        assert_eq!(call.request.path, "/other");
        assert_eq!(call.request.method, HttpMethod::Post);
        assert_eq!(call.request.body, RequestBody::Json(json!({"replaced": true})));
    }

    #[tokio::test]
    async fn transport_failure_becomes_node_error() {
        let transport = Arc::new(RecordingTransport::new().respond(Err(TransportError::Status {
            status: 401,
            body: json!({"message": "Invalid API key"}),
        })));
        let err = gateway(transport).get("/integrations").await.unwrap_err();
        assert_eq!(err.node, "Postiz");
        assert_eq!(err.http_code, Some(401));
        assert_eq!(err.user_message(), "Invalid API key");
    }

    #[tokio::test]
    async fn missing_credentials_never_reach_transport() {
        let transport = Arc::new(RecordingTransport::new());
        let gateway = ApiGateway::new(
            Provider::GROWCHIEF,
            Logger::new("test"),
            Arc::new(StaticCredentials::new()),
            transport.clone(),
        );
        let err = gateway.get("/workflows").await.unwrap_err();
        assert!(err.message.contains("growchiefApi"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn credential_test_targets_host_not_prefix() {
        let transport = Arc::new(RecordingTransport::new().respond(Ok(json!("anything"))));
        let result = gateway(transport.clone()).test_credentials().await;
        assert!(result.ok);
        let call = transport.last();
        assert_eq!(call.request.base_url, "https://api.postiz.com");
        assert_eq!(call.request.path, "/public/v1/is-connected");
        assert_eq!(call.request.method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn credential_test_reports_failure() {
        let transport = Arc::new(RecordingTransport::new().respond(Err(TransportError::Status {
            status: 403,
            body: json!({"connected": true}),
        })));
        let result = gateway(transport).test_credentials().await;
        assert!(!result.ok);
        assert_eq!(result.message, "Request failed with status code 403");
    }
}
