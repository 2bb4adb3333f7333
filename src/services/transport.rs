use crate::constants::{env as env_keys, network};
use crate::errors::{ToolError, TransportError};
use crate::services::credentials::{Credentials, Provider};
use crate::services::logger::Logger;
use crate::services::request::{HttpMethod, RequestBody, RequestDescriptor};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Performs one authenticated call and returns the decoded body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn perform_authenticated(
        &self,
        provider: &Provider,
        credentials: &Credentials,
        request: RequestDescriptor,
    ) -> Result<Value, TransportError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    logger: Logger,
    client: Client,
}

fn resolve_timeout_ms() -> u64 {
    std::env::var(env_keys::HTTP_TIMEOUT_MS)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(network::TIMEOUT_HTTP_REQUEST_MS)
}

impl ReqwestTransport {
    pub fn new(logger: Logger) -> Result<Self, ToolError> {
        let client = Client::builder()
            .user_agent(network::USER_AGENT)
            .connect_timeout(Duration::from_millis(network::TIMEOUT_CONNECTION_MS))
            .timeout(Duration::from_millis(resolve_timeout_ms()))
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self::with_client(logger, client))
    }

    pub fn with_client(logger: Logger, client: Client) -> Self {
        Self {
            logger: logger.child("http"),
            client,
        }
    }
}

fn build_headers(
    provider: &Provider,
    credentials: &Credentials,
) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(network::ACCEPT));
    for (name, value) in provider.auth_headers(credentials) {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidRequest("Invalid header name".to_string()))?;
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            TransportError::InvalidRequest("API key contains invalid header characters".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    Ok(headers)
}

fn build_form(body: crate::services::request::MultipartPayload) -> Result<Form, TransportError> {
    let part = Part::bytes(body.bytes)
        .file_name(body.file_name)
        .mime_str(&body.mime_type)
        .map_err(|err| TransportError::InvalidRequest(format!("Invalid MIME type: {}", err)))?;
    Ok(Form::new().part(body.field, part))
}

fn decode_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Network(err.to_string())
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform_authenticated(
        &self,
        provider: &Provider,
        credentials: &Credentials,
        request: RequestDescriptor,
    ) -> Result<Value, TransportError> {
        let url = request.url()?;
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), url.clone())
            .headers(build_headers(provider, credentials)?);

        match request.body {
            RequestBody::Multipart(payload) => {
                builder = builder.multipart(build_form(payload)?);
            }
            body if body.is_empty() => {}
            RequestBody::Json(value) => {
                builder = builder.json(&value);
            }
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        let body = decode_body(&text);

        self.logger.debug(
            "HTTP response",
            Some(&serde_json::json!({
                "provider": provider.name,
                "method": request.method.as_str(),
                "url": url.as_str(),
                "status": status.as_u16(),
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub provider: &'static str,
        pub api_key: String,
        pub request: RequestDescriptor,
    }

    /// Records every request and replays scripted results in order.
    /// Once the script is exhausted every call returns `{}`.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub calls: Mutex<Vec<RecordedCall>>,
        script: Mutex<VecDeque<Result<Value, TransportError>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, result: Result<Value, TransportError>) -> Self {
            if let Ok(mut script) = self.script.lock() {
                script.push_back(result);
            }
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub fn last(&self) -> RecordedCall {
            self.calls().pop().expect("at least one recorded call")
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn perform_authenticated(
            &self,
            provider: &Provider,
            credentials: &Credentials,
            request: RequestDescriptor,
        ) -> Result<Value, TransportError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(RecordedCall {
                    provider: provider.name,
                    api_key: credentials.api_key.clone(),
                    request,
                });
            }
            self.script
                .lock()
                .ok()
                .and_then(|mut script| script.pop_front())
                .unwrap_or_else(|| Ok(serde_json::json!({})))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::request::MultipartPayload;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn transport() -> ReqwestTransport {
        let client = Client::builder().no_proxy().build().expect("client");
        ReqwestTransport::with_client(Logger::new("test"), client)
    }

    fn descriptor(base: &str, method: HttpMethod, path: &str) -> RequestDescriptor {
        RequestDescriptor {
            base_url: format!("{}/public/v1", base),
            method,
            path: path.to_string(),
            body: RequestBody::empty(),
            query: None,
        }
    }

    #[tokio::test]
    async fn sends_raw_api_key_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public/v1/posts"))
            .and(header("Authorization", "pk_live"))
            .and(body_json(json!({"type": "now"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"postId": "p1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = descriptor(&server.uri(), HttpMethod::Post, "/posts");
        request.body = RequestBody::Json(json!({"type": "now"}));
        let creds = Credentials::new("pk_live", server.uri());
        let out = transport()
            .perform_authenticated(&Provider::POSTIZ, &creds, request)
            .await
            .expect("success");
        assert_eq!(out, json!([{"postId": "p1"}]));
    }

    #[tokio::test]
    async fn get_without_query_has_no_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/integrations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let creds = Credentials::new("k", server.uri());
        transport()
            .perform_authenticated(
                &Provider::POSTIZ,
                &creds,
                descriptor(&server.uri(), HttpMethod::Get, "/integrations"),
            )
            .await
            .expect("success");

        let received: Vec<Request> = server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1);
        assert!(received[0].url.query().is_none());
        assert!(received[0].body.is_empty());
    }

    #[tokio::test]
    async fn query_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/posts"))
            .and(query_param("week", "4"))
            .and(query_param("display", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": []})))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = descriptor(&server.uri(), HttpMethod::Get, "/posts");
        request.query = json!({"week": 4, "display": "week"}).as_object().cloned();
        let out = transport()
            .perform_authenticated(&Provider::POSTIZ, &Credentials::new("k", server.uri()), request)
            .await
            .expect("success");
        assert_eq!(out, json!({"posts": []}));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/public/v1/posts/p-9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Post not found"})))
            .mount(&server)
            .await;

        let err = transport()
            .perform_authenticated(
                &Provider::POSTIZ,
                &Credentials::new("k", server.uri()),
                descriptor(&server.uri(), HttpMethod::Delete, "/posts/p-9"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.remote_description().as_deref(), Some("Post not found"));
    }

    #[tokio::test]
    async fn multipart_upload_carries_file_name_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public/v1/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f1"})))
            .mount(&server)
            .await;

        let mut request = descriptor(&server.uri(), HttpMethod::Post, "/upload");
        request.body = RequestBody::Multipart(MultipartPayload {
            field: "file".to_string(),
            file_name: "cat.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"PNGDATA".to_vec(),
        });
        transport()
            .perform_authenticated(&Provider::POSTIZ, &Credentials::new("k", server.uri()), request)
            .await
            .expect("success");

        let received = server.received_requests().await.unwrap_or_default();
        let content_type = received[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = String::from_utf8_lossy(&received[0].body).to_string();
        assert!(content_type.starts_with("multipart/form-data"));
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"cat.png\""));
        assert!(body.contains("Content-Type: image/png"));
        assert!(body.contains("PNGDATA"));
    }

    #[test]
    fn decode_body_handles_empty_and_text() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("ok"), Value::String("ok".to_string()));
        assert_eq!(decode_body("{\"a\":1}"), json!({"a": 1}));
    }
}
