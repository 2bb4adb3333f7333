mod api_error;
mod mcp_error;
mod node_error;
mod tool_error;

pub use api_error::{ApiError, CredentialError, TransportError};
pub use mcp_error::{ErrorCode, McpError};
pub use node_error::NodeError;
pub use tool_error::{ToolError, ToolErrorKind};
