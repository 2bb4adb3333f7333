pub mod credentials;
pub mod execution;
pub mod logger;
pub mod request;
pub mod tool_executor;
pub mod transport;
pub mod validation;
