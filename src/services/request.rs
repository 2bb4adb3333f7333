use crate::errors::TransportError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-file multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartPayload {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MultipartPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartPayload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartPayload),
}

impl RequestBody {
    pub fn empty() -> Self {
        RequestBody::Json(Value::Object(Map::new()))
    }

    /// Empty bodies (`{}` or `null`) are not put on the wire.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Json(Value::Null) => true,
            RequestBody::Json(Value::Object(map)) => map.is_empty(),
            _ => false,
        }
    }

    fn summary(&self) -> Value {
        match self {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Multipart(payload) => serde_json::json!({
                "multipart": {
                    "field": payload.field,
                    "fileName": payload.file_name,
                    "mimeType": payload.mime_type,
                    "bytes": payload.bytes.len(),
                }
            }),
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<MultipartPayload> for RequestBody {
    fn from(payload: MultipartPayload) -> Self {
        RequestBody::Multipart(payload)
    }
}

pub type Query = Map<String, Value>;

/// Fully assembled request, built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub base_url: String,
    pub method: HttpMethod,
    pub path: String,
    pub body: RequestBody,
    /// `None` means no query string at all.
    pub query: Option<Query>,
}

impl RequestDescriptor {
    pub fn url(&self) -> Result<Url, TransportError> {
        let base = self.base_url.trim_end_matches('/');
        let raw = if self.path.is_empty() {
            base.to_string()
        } else if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        };
        let mut url = Url::parse(&raw).map_err(|err| {
            TransportError::InvalidRequest(format!("Invalid URL {}: {}", raw, err))
        })?;
        if let Some(query) = self.query.as_ref() {
            let encoded = encode_query(query)?;
            if !encoded.is_empty() {
                url.set_query(Some(&encoded));
            }
        }
        Ok(url)
    }

    /// Loggable view without credentials or file bytes.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "method": self.method.as_str(),
            "baseURL": self.base_url,
            "url": self.path,
            "qs": self.query,
            "body": self.body.summary(),
        })
    }
}

/// Partial descriptor; every present field replaces the assembled one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverride {
    pub base_url: Option<String>,
    pub method: Option<HttpMethod>,
    pub path: Option<String>,
    pub body: Option<RequestBody>,
    pub query: Option<Option<Query>>,
}

impl RequestOverride {
    pub fn body(body: impl Into<RequestBody>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, mut descriptor: RequestDescriptor) -> RequestDescriptor {
        if let Some(base_url) = self.base_url {
            descriptor.base_url = base_url;
        }
        if let Some(method) = self.method {
            descriptor.method = method;
        }
        if let Some(path) = self.path {
            descriptor.path = path;
        }
        if let Some(body) = self.body {
            descriptor.body = body;
        }
        if let Some(query) = self.query {
            descriptor.query = query;
        }
        descriptor
    }
}

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

pub fn encode_query(query: &Query) -> Result<String, TransportError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(rendered) = render_query_value(item) {
                        pairs.push((key.clone(), rendered));
                    }
                }
            }
            other => {
                if let Some(rendered) = render_query_value(other) {
                    pairs.push((key.clone(), rendered));
                }
            }
        }
    }
    serde_urlencoded::to_string(pairs)
        .map_err(|err| TransportError::InvalidRequest(format!("Invalid query: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(query: Option<Query>) -> RequestDescriptor {
        RequestDescriptor {
            base_url: "https://api.postiz.com/public/v1".to_string(),
            method: HttpMethod::Get,
            path: "/posts".to_string(),
            body: RequestBody::empty(),
            query,
        }
    }

    #[test]
    fn missing_query_leaves_no_question_mark() {
        let url = descriptor(None).url().expect("url");
        assert_eq!(url.as_str(), "https://api.postiz.com/public/v1/posts");
        assert!(url.query().is_none());
    }

    #[test]
    fn query_values_are_rendered_as_plain_text() {
        let query = json!({"week": 3, "display": "week", "customer": "c 1"})
            .as_object()
            .cloned();
        let url = descriptor(query).url().expect("url");
        assert_eq!(url.query(), Some("customer=c+1&display=week&week=3"));
    }

    #[test]
    fn override_replaces_fields_wholesale() {
        let payload = MultipartPayload {
            field: "file".to_string(),
            file_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let merged = RequestOverride {
            body: Some(RequestBody::Multipart(payload.clone())),
            query: Some(Some(json!({"x": 1}).as_object().cloned().unwrap_or_default())),
            ..Default::default()
        }
        .apply(descriptor(None));
        assert_eq!(merged.body, RequestBody::Multipart(payload));
        assert_eq!(merged.method, HttpMethod::Get);
        assert_eq!(merged.base_url, "https://api.postiz.com/public/v1");
        assert_eq!(merged.query.as_ref().map(|q| q.len()), Some(1));
    }

    #[test]
    fn empty_json_bodies_are_detected() {
        assert!(RequestBody::empty().is_empty());
        assert!(RequestBody::Json(Value::Null).is_empty());
        assert!(!RequestBody::Json(json!({"a": 1})).is_empty());
        assert!(!RequestBody::Json(json!([])).is_empty());
    }
}
