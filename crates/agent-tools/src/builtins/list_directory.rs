use crate::builtins::common::is_excluded_dir;
use crate::contract::ToolHandler;
use agent_core::{AgentError, ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

pub struct ListDirectoryHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_directory".to_string(),
        description: "List the contents of a directory within the workspace.".to_string(),
        parameters: vec![
            ToolParameter::optional("path", ParamType::String, "directory to list")
                .with_default(json!(".")),
            ToolParameter::optional("recursive", ParamType::Boolean, "descend into subdirectories"),
            ToolParameter::optional("max_depth", ParamType::Number, "maximum recursion depth"),
        ],
        safe: true,
    }
}

#[async_trait]
impl ToolHandler for ListDirectoryHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let path_str = call.get_str("path").unwrap_or(".");
        let recursive = call.params.get("recursive").and_then(|v| v.as_bool()).unwrap_or(false);
        let max_depth = call
            .params
            .get("max_depth")
            .and_then(|v| v.as_u64())
            .unwrap_or(u64::MAX);

        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        let mut entries = Vec::new();
        if let Err(e) = walk(&resolved, &resolved, 0, recursive, max_depth, &mut entries) {
            return ToolResult::failure(
                AgentError::Io {
                    path: path_str.to_string(),
                    source: e,
                }
                .to_string(),
            );
        }
        entries.sort();

        let mut metadata = HashMap::new();
        metadata.insert("count".to_string(), json!(entries.len()));
        ToolResult::success_with_metadata(entries.join("\n"), metadata)
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    depth: u64,
    recursive: bool,
    max_depth: u64,
    out: &mut Vec<String>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_excluded_dir(&name) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        if path.is_dir() {
            out.push(format!("{relative}/"));
            if recursive && depth + 1 < max_depth {
                walk(root, &path, depth + 1, recursive, max_depth, out)?;
            }
        } else {
            out.push(relative);
        }
    }
    Ok(())
}
