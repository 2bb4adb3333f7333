pub mod collection;
pub mod merge;
pub mod paths;
pub mod redact;
pub mod text;
pub mod tool_errors;
