use crate::errors::{ApiError, ToolError};
use thiserror::Error;

/// Why a single input item failed.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Invalid(#[from] ToolError),
}

impl NodeError {
    /// Text placed in the item's `{ "error": ... }` record.
    pub fn item_message(&self) -> String {
        match self {
            NodeError::Api(err) => err.user_message().to_string(),
            NodeError::Invalid(err) => err.message.clone(),
        }
    }
}
