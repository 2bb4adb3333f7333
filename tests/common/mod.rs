#![allow(dead_code)]

use once_cell::sync::Lazy;
use saas_nodes::app::App;
use saas_nodes::services::credentials::{Credentials, Provider, StaticCredentials};
use saas_nodes::services::logger::Logger;
use saas_nodes::services::transport::ReqwestTransport;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Both nodes pointed at `host` with fixed keys.
pub fn app_for(host: &str) -> App {
    let credentials = StaticCredentials::new()
        .with(&Provider::POSTIZ, Credentials::new("pk_test", host))
        .with(&Provider::GROWCHIEF, Credentials::new("gc_test", host));
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("http client");
    let logger = Logger::new("test");
    let transport = ReqwestTransport::with_client(logger.clone(), client);
    App::with_parts(logger, Arc::new(credentials), Arc::new(transport)).expect("app")
}

/// Runs a tool call and returns the handler result from the envelope.
pub async fn call(app: &App, tool: &str, args: Value) -> Value {
    let payload = app.tool_executor.execute(tool, args).await.expect("tool call");
    assert_eq!(payload["ok"], true);
    payload["result"].clone()
}

pub fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("saas-nodes-{}-{}", uuid::Uuid::new_v4(), name))
}
