use crate::errors::ToolError;

/// Case-insensitive matches of `wanted` among `known`, and the hint text.
fn suggestion_hint<S: AsRef<str>>(wanted: &str, known: &[S]) -> (Vec<String>, String) {
    let wanted = wanted.trim().to_lowercase();
    let did_you_mean: Vec<String> = known
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| !wanted.is_empty() && name.to_lowercase() == wanted)
        .map(|name| name.to_string())
        .collect();
    let names: Vec<&str> = known.iter().map(|name| name.as_ref()).collect();

    let mut hint = format!("Use one of: {}.", names.join(", "));
    if !did_you_mean.is_empty() {
        hint = format!("Did you mean: {}? {}", did_you_mean.join(", "), hint);
    }
    (did_you_mean, hint)
}

pub fn unknown_operation_error(node: &str, operation: &str, known: &[&str]) -> ToolError {
    let (did_you_mean, hint) = suggestion_hint(operation, known);
    ToolError::invalid_params(format!(
        "The operation \"{}\" is not known for {}",
        operation, node
    ))
    .with_hint(hint)
    .with_details(serde_json::json!({
        "known_operations": known,
        "did_you_mean": did_you_mean,
    }))
}

pub fn unknown_tool_error(tool: &str, known: &[String]) -> ToolError {
    let (did_you_mean, hint) = suggestion_hint(tool, known);
    ToolError::invalid_params(format!("Unknown tool: {}", tool))
        .with_hint(hint)
        .with_details(serde_json::json!({
            "known_tools": known,
            "did_you_mean": did_you_mean,
        }))
}
