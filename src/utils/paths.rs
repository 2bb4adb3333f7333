use crate::constants::env as env_keys;
use std::env;
use std::path::PathBuf;

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_xdg_state_dir() -> Option<PathBuf> {
    if let Some(path) = normalize_env_path(env::var("XDG_STATE_HOME").ok()) {
        return Some(path);
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("state"))
}

pub fn resolve_state_dir() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var(env_keys::STATE_DIR).ok()) {
        return path;
    }
    if let Some(path) = resolve_xdg_state_dir() {
        return path.join("saas-nodes");
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn resolve_credentials_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var(env_keys::CREDENTIALS_PATH).ok()) {
        return path;
    }
    resolve_state_dir().join("credentials.json")
}
