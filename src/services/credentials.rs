use crate::constants::{growchief, postiz};
use crate::errors::{CredentialError, ToolError};
use crate::services::logger::Logger;
use crate::utils::paths::resolve_credentials_path;
use crate::utils::text::non_empty;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use url::Url;

/// A named credential and authentication configuration for one remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    pub node: &'static str,
    pub api_prefix: &'static str,
    pub test_path: &'static str,
    pub default_host: &'static str,
    pub env_api_key: &'static str,
    pub env_host: &'static str,
}

impl Provider {
    pub const POSTIZ: Provider = Provider {
        name: postiz::CREDENTIAL_NAME,
        node: postiz::NODE_NAME,
        api_prefix: postiz::API_PREFIX,
        test_path: postiz::TEST_PATH,
        default_host: postiz::DEFAULT_HOST,
        env_api_key: postiz::ENV_API_KEY,
        env_host: postiz::ENV_HOST,
    };

    pub const GROWCHIEF: Provider = Provider {
        name: growchief::CREDENTIAL_NAME,
        node: growchief::NODE_NAME,
        api_prefix: growchief::API_PREFIX,
        test_path: growchief::TEST_PATH,
        default_host: growchief::DEFAULT_HOST,
        env_api_key: growchief::ENV_API_KEY,
        env_host: growchief::ENV_HOST,
    };

    pub fn all() -> [Provider; 2] {
        [Provider::POSTIZ, Provider::GROWCHIEF]
    }

    pub fn by_name(name: &str) -> Option<Provider> {
        let wanted = name.trim().to_lowercase();
        Provider::all().into_iter().find(|provider| {
            provider.name.to_lowercase() == wanted || provider.node.to_lowercase() == wanted
        })
    }

    /// Headers attached to every request: the raw key, no scheme prefix.
    pub fn auth_headers(&self, credentials: &Credentials) -> Vec<(&'static str, String)> {
        vec![("Authorization", credentials.api_key.clone())]
    }

    /// `host + api_prefix` without doubling the joining slash.
    pub fn base_url(&self, credentials: &Credentials) -> String {
        format!("{}{}", credentials.host.trim_end_matches('/'), self.api_prefix)
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(default)]
    pub host: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: host.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("host", &self.host)
            .finish()
    }
}

pub trait CredentialSource: Send + Sync {
    fn get_credentials(&self, provider: &Provider) -> Result<Credentials, CredentialError>;
}

fn finalize(
    provider: &Provider,
    mut credentials: Credentials,
) -> Result<Credentials, CredentialError> {
    if credentials.host.trim().is_empty() {
        credentials.host = provider.default_host.to_string();
    }
    credentials.host = credentials.host.trim().to_string();
    let parsed = Url::parse(&credentials.host).map_err(|err| CredentialError::Invalid {
        provider: provider.name.to_string(),
        reason: format!("host is not a valid URL: {}", err),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CredentialError::Invalid {
            provider: provider.name.to_string(),
            reason: "host must use http or https".to_string(),
        });
    }
    if credentials.api_key.trim().is_empty() {
        return Err(CredentialError::Invalid {
            provider: provider.name.to_string(),
            reason: "apiKey is empty".to_string(),
        });
    }
    Ok(credentials)
}

/// Credentials read from the credentials file, with per-provider
/// environment overrides applied on every lookup.
#[derive(Clone)]
pub struct CredentialService {
    logger: Logger,
    file_path: PathBuf,
    stored: Arc<RwLock<HashMap<String, Credentials>>>,
}

impl CredentialService {
    pub fn new(logger: Logger) -> Result<Self, ToolError> {
        Self::with_path(logger, resolve_credentials_path())
    }

    pub fn with_path(logger: Logger, file_path: PathBuf) -> Result<Self, ToolError> {
        let service = Self {
            logger: logger.child("credentials"),
            file_path,
            stored: Arc::new(RwLock::new(HashMap::new())),
        };
        service.reload()?;
        Ok(service)
    }

    pub fn reload(&self) -> Result<(), ToolError> {
        let loaded = if self.file_path.exists() {
            let raw = std::fs::read_to_string(&self.file_path).map_err(|err| {
                ToolError::internal(format!("Failed to read credentials file: {}", err))
            })?;
            parse_credentials_file(&raw)?
        } else {
            HashMap::new()
        };
        self.logger.debug(
            "Loaded credentials",
            Some(&serde_json::json!({
                "path": self.file_path,
                "providers": loaded.keys().collect::<Vec<_>>(),
            })),
        );
        let mut guard = self
            .stored
            .write()
            .map_err(|_| ToolError::internal("Credential store lock poisoned"))?;
        *guard = loaded;
        Ok(())
    }
}

fn parse_credentials_file(raw: &str) -> Result<HashMap<String, Credentials>, ToolError> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|err| ToolError::internal(format!("Failed to parse credentials file: {}", err)))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| ToolError::invalid_params("Credentials file must be a JSON object"))?;
    let mut out = HashMap::new();
    for (name, entry) in obj {
        let credentials: Credentials = serde_json::from_value(entry.clone()).map_err(|err| {
            ToolError::invalid_params(format!("Credentials entry '{}' is invalid: {}", name, err))
        })?;
        out.insert(name.clone(), credentials);
    }
    Ok(out)
}

impl CredentialSource for CredentialService {
    fn get_credentials(&self, provider: &Provider) -> Result<Credentials, CredentialError> {
        let stored = self
            .stored
            .read()
            .ok()
            .and_then(|guard| guard.get(provider.name).cloned());
        let env_key = std::env::var(provider.env_api_key).ok().and_then(|v| non_empty(&v));
        let env_host = std::env::var(provider.env_host).ok().and_then(|v| non_empty(&v));

        if stored.is_none() && env_key.is_none() {
            return Err(CredentialError::Missing(provider.name.to_string()));
        }
        let mut credentials = stored.unwrap_or_else(|| Credentials::new("", ""));
        if let Some(key) = env_key {
            credentials.api_key = key;
        }
        if let Some(host) = env_host {
            credentials.host = host;
        }
        finalize(provider, credentials)
    }
}

/// In-memory credentials keyed by provider name.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, Credentials>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: &Provider, credentials: Credentials) -> Self {
        self.entries.insert(provider.name.to_string(), credentials);
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get_credentials(&self, provider: &Provider) -> Result<Credentials, CredentialError> {
        let credentials = self
            .entries
            .get(provider.name)
            .cloned()
            .ok_or_else(|| CredentialError::Missing(provider.name.to_string()))?;
        finalize(provider, credentials)
    }
}
