pub mod network {
    pub const TIMEOUT_HTTP_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_CONNECTION_MS: u64 = 5_000;
    pub const USER_AGENT: &str = concat!("saas-nodes/", env!("CARGO_PKG_VERSION"));
    pub const ACCEPT: &str = "application/json, text/plain, */*";
}

pub mod postiz {
    pub const NODE_NAME: &str = "Postiz";
    pub const CREDENTIAL_NAME: &str = "postizApi";
    pub const API_PREFIX: &str = "/public/v1";
    pub const TEST_PATH: &str = "/public/v1/is-connected";
    pub const DEFAULT_HOST: &str = "https://api.postiz.com";
    pub const ENV_API_KEY: &str = "POSTIZ_API_KEY";
    pub const ENV_HOST: &str = "POSTIZ_HOST";
}

pub mod growchief {
    pub const NODE_NAME: &str = "Growchief";
    pub const CREDENTIAL_NAME: &str = "growchiefApi";
    pub const API_PREFIX: &str = "/public";
    pub const TEST_PATH: &str = "/public/is-connected";
    pub const DEFAULT_HOST: &str = "https://api.growchief.com";
    pub const ENV_API_KEY: &str = "GROWCHIEF_API_KEY";
    pub const ENV_HOST: &str = "GROWCHIEF_HOST";
}

pub mod posts {
    pub const DEFAULT_WEEK: i64 = 1;
    pub const DEFAULT_DAY: i64 = 0;
    pub const DEFAULT_DISPLAY: &str = "day";
    pub const DEFAULT_MONTH: i64 = 5;
    pub const UPLOAD_FIELD: &str = "file";
    pub const DEFAULT_VIDEO_TYPE: &str = "image-text-slides";
}

pub mod limits {
    pub const LOG_STRING_LENGTH: usize = 512;
    pub const ERROR_BODY_LENGTH: usize = 512;
}

pub mod env {
    pub const CREDENTIALS_PATH: &str = "SAAS_NODES_CREDENTIALS_PATH";
    pub const HTTP_TIMEOUT_MS: &str = "SAAS_NODES_HTTP_TIMEOUT_MS";
    pub const STATE_DIR: &str = "SAAS_NODES_STATE_DIR";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}
