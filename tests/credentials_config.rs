mod common;

use common::{temp_path, ENV_LOCK};
use saas_nodes::app::App;
use saas_nodes::errors::CredentialError;
use saas_nodes::services::credentials::{CredentialService, CredentialSource, Provider};
use saas_nodes::services::logger::Logger;
use saas_nodes::services::transport::ReqwestTransport;
use serde_json::json;
use std::sync::Arc;

const ENV_KEYS: [&str; 4] = ["POSTIZ_API_KEY", "POSTIZ_HOST", "GROWCHIEF_API_KEY", "GROWCHIEF_HOST"];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn file_credentials_fill_in_default_host() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    let path = temp_path("credentials.json");
    std::fs::write(
        &path,
        json!({"postizApi": {"apiKey": "pk_file"}, "growchiefApi": {"apiKey": "gc_file", "host": "https://gc.internal/"}})
            .to_string(),
    )
    .expect("write credentials");

    let service = CredentialService::with_path(Logger::new("test"), path.clone()).expect("service");
    let postiz = service.get_credentials(&Provider::POSTIZ).expect("postiz");
    assert_eq!(postiz.api_key, "pk_file");
    assert_eq!(postiz.host, "https://api.postiz.com");
    assert_eq!(Provider::POSTIZ.base_url(&postiz), "https://api.postiz.com/public/v1");

    let growchief = service.get_credentials(&Provider::GROWCHIEF).expect("growchief");
    assert_eq!(Provider::GROWCHIEF.base_url(&growchief), "https://gc.internal/public");
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn environment_overrides_file_values() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    let path = temp_path("credentials.json");
    std::fs::write(&path, json!({"postizApi": {"apiKey": "pk_file"}}).to_string())
        .expect("write credentials");
    std::env::set_var("POSTIZ_API_KEY", "pk_env");
    std::env::set_var("POSTIZ_HOST", "http://postiz.local:5000");

    let service = CredentialService::with_path(Logger::new("test"), path.clone()).expect("service");
    let postiz = service.get_credentials(&Provider::POSTIZ).expect("postiz");
    assert_eq!(postiz.api_key, "pk_env");
    assert_eq!(postiz.host, "http://postiz.local:5000");

    clear_env();
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn missing_and_invalid_credentials_are_reported() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    let service =
        CredentialService::with_path(Logger::new("test"), temp_path("absent.json")).expect("service");
    assert!(matches!(
        service.get_credentials(&Provider::GROWCHIEF),
        Err(CredentialError::Missing(_))
    ));

    std::env::set_var("GROWCHIEF_API_KEY", "gc_env");
    std::env::set_var("GROWCHIEF_HOST", "ftp://growchief.test");
    assert!(matches!(
        service.get_credentials(&Provider::GROWCHIEF),
        Err(CredentialError::Invalid { .. })
    ));
    clear_env();
}

#[tokio::test]
async fn unconfigured_provider_fails_each_item_without_network() {
    let _guard = ENV_LOCK.lock().await;
    clear_env();
    let logger = Logger::new("test");
    let service = CredentialService::with_path(logger.clone(), temp_path("absent.json")).expect("service");
    let transport = ReqwestTransport::new(logger.clone()).expect("transport");
    let app = App::with_parts(logger, Arc::new(service), Arc::new(transport)).expect("app");

    let payload = app
        .tool_executor
        .execute(
            "postiz",
            json!({
                "parameters": {"operation": "getIntegrations"},
                "items": [{"json": {}}, {"json": {}}]
            }),
        )
        .await
        .expect("call");
    let items = payload["result"]["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    for item in items {
        assert_eq!(item["json"]["error"], "Credentials for postizApi are not configured");
    }
}

#[test]
fn malformed_credentials_file_is_rejected() {
    let path = temp_path("broken.json");
    std::fs::write(&path, "[1, 2]").expect("write");
    let err = CredentialService::with_path(Logger::new("test"), path.clone())
        .err()
        .expect("rejected");
    assert_eq!(err.message, "Credentials file must be a JSON object");
    let _ = std::fs::remove_file(path);
}
