use crate::contract::ToolHandler;
use agent_core::{AgentError, ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

const DANGEROUS_PATTERNS: &[&str] = &["<script>", "eval(", "rm -rf"];

pub struct WriteFileHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "write_file".to_string(),
        description: "Write content to a file within the workspace, creating it if needed.".to_string(),
        parameters: vec![
            ToolParameter::required("path", ParamType::String, "path to write, relative to the workspace root"),
            ToolParameter::required("content", ParamType::String, "full file content to write"),
            ToolParameter::optional("create_dirs", ParamType::Boolean, "create missing parent directories")
                .with_default(json!(true)),
        ],
        safe: false,
    }
}

#[async_trait]
impl ToolHandler for WriteFileHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(path_str) = call.get_str("path") else {
            return ToolResult::failure("missing required parameter 'path'");
        };
        let Some(content) = call.get_str("content") else {
            return ToolResult::failure("missing required parameter 'content'");
        };
        let create_dirs = call
            .params
            .get("create_dirs")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        for pattern in DANGEROUS_PATTERNS {
            if content.contains(pattern) {
                tracing::warn!(pattern, path = path_str, "write_file content matches a known-dangerous pattern");
            }
        }

        let existed = resolved.exists();
        if let Some(parent) = resolved.parent() {
            if !parent.exists() {
                if !create_dirs {
                    return ToolResult::failure(format!(
                        "parent directory '{}' does not exist and create_dirs is false",
                        parent.display()
                    ));
                }
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ToolResult::failure(
                        AgentError::Io {
                            path: parent.display().to_string(),
                            source: e,
                        }
                        .to_string(),
                    );
                }
            }
        }

        if let Err(e) = std::fs::write(&resolved, content) {
            return ToolResult::failure(classify_write_error(path_str, e));
        }

        let lines = if content.is_empty() {
            0
        } else {
            content.matches('\n').count() + 1
        };

        let mut metadata = HashMap::new();
        metadata.insert("path".to_string(), json!(path_str));
        metadata.insert("size".to_string(), json!(content.len()));
        metadata.insert("lines".to_string(), json!(lines));
        metadata.insert("created".to_string(), json!(!existed));
        ToolResult::success_with_metadata(
            format!("wrote {} bytes to {}", content.len(), path_str),
            metadata,
        )
    }
}

fn classify_write_error(path: &str, e: std::io::Error) -> String {
    let sub_kind = match e.kind() {
        std::io::ErrorKind::PermissionDenied => "permission",
        std::io::ErrorKind::NotFound => "not-found",
        _ if e.raw_os_error() == Some(28) => "out-of-space",
        _ if e.raw_os_error() == Some(30) => "read-only",
        _ => "unknown",
    };
    format!(
        "{} (sub_kind={sub_kind})",
        AgentError::Io {
            path: path.to_string(),
            source: e,
        }
    )
}
