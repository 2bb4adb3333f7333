use crate::constants::limits;
use crate::utils::text::truncate_utf8_prefix;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by an `HttpTransport`.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Value },
    #[error("Request timed out")]
    Timeout,
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable detail carried by the remote body, if any, capped at
    /// `limits::ERROR_BODY_LENGTH` bytes.
    pub fn remote_description(&self) -> Option<String> {
        match self {
            TransportError::Status { body, .. } => describe_body(body)
                .map(|text| truncate_utf8_prefix(&text, limits::ERROR_BODY_LENGTH)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Credentials for {0} are not configured")]
    Missing(String),
    #[error("Credentials for {provider} are invalid: {reason}")]
    Invalid { provider: String, reason: String },
}

/// Remote call failure attributed to the node that issued it.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}", self.user_message())]
pub struct ApiError {
    pub node: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

impl ApiError {
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
            description: None,
            http_code: None,
        }
    }

    pub fn from_transport(node: &str, err: TransportError) -> Self {
        Self {
            node: node.to_string(),
            message: err.to_string(),
            description: err.remote_description(),
            http_code: err.status_code(),
        }
    }

    pub fn from_credentials(node: &str, err: CredentialError) -> Self {
        Self::new(node, err.to_string())
    }

    /// `description` when the remote supplied one, otherwise `message`.
    pub fn user_message(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.message)
    }
}

fn describe_body(body: &Value) -> Option<String> {
    match body {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Object(map) => ["description", "message", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(describe_field),
        _ => None,
    }
}

fn describe_field(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(_) => describe_body(value),
        _ => None,
    }
}
