use crate::contract::ToolHandler;
use agent_core::{AgentError, ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

pub struct ReadFileHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_file".to_string(),
        description: "Read the contents of a file within the workspace.".to_string(),
        parameters: vec![
            ToolParameter::required("path", ParamType::String, "path to read, relative to the workspace root"),
            ToolParameter::optional("encoding", ParamType::String, "text encoding")
                .with_default(json!("utf-8")),
        ],
        safe: true,
    }
}

#[async_trait]
impl ToolHandler for ReadFileHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(path_str) = call.get_str("path") else {
            return ToolResult::failure("missing required parameter 'path'");
        };
        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        match std::fs::read(&resolved) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                let lines = if content.is_empty() { 1 } else { content.lines().count() };
                let relative = resolved
                    .strip_prefix(&ctx.workspace_root)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| path_str.to_string());

                let mut metadata = HashMap::new();
                metadata.insert("absolute_path".to_string(), json!(resolved.display().to_string()));
                metadata.insert("workspace_relative_path".to_string(), json!(relative));
                metadata.insert("size".to_string(), json!(bytes.len()));
                metadata.insert("lines".to_string(), json!(lines));
                ToolResult::success_with_metadata(content, metadata)
            }
            Err(e) => ToolResult::failure(
                AgentError::Io {
                    path: path_str.to_string(),
                    source: e,
                }
                .to_string(),
            ),
        }
    }
}
