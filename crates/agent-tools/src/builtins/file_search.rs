use crate::builtins::common::{glob_like_match, is_excluded_dir};
use crate::contract::ToolHandler;
use agent_core::{ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

const MAX_RESULTS: usize = 200;

pub struct FileSearchHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "file_search".to_string(),
        description: "Find files or directories under the workspace by name pattern.".to_string(),
        parameters: vec![
            ToolParameter::required("pattern", ParamType::String, "glob-like name pattern"),
            ToolParameter::optional("path", ParamType::String, "directory to search")
                .with_default(json!(".")),
            ToolParameter::optional("type", ParamType::String, "file, directory, or any")
                .with_default(json!("any")),
            ToolParameter::optional("max_depth", ParamType::Number, "maximum recursion depth")
                .with_default(json!(10)),
        ],
        safe: true,
    }
}

#[async_trait]
impl ToolHandler for FileSearchHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(pattern) = call.get_str("pattern") else {
            return ToolResult::failure("missing required parameter 'pattern'");
        };
        let path_str = call.get_str("path").unwrap_or(".");
        let entry_type = call.get_str("type").unwrap_or("any");
        let max_depth = call.params.get("max_depth").and_then(|v| v.as_u64()).unwrap_or(10);

        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut truncated = false;
        walk(&resolved, &resolved, 0, max_depth, pattern, entry_type, &mut dirs, &mut files, &mut truncated);

        dirs.sort();
        files.sort();
        let mut results = dirs;
        results.extend(files);
        results.truncate(MAX_RESULTS);

        let mut metadata = HashMap::new();
        metadata.insert("count".to_string(), json!(results.len()));
        metadata.insert("truncated".to_string(), json!(truncated));
        ToolResult::success_with_metadata(results.join("\n"), metadata)
    }
}

#[allow(clippy::too_many_arguments)]
fn walk(
    root: &Path,
    dir: &Path,
    depth: u64,
    max_depth: u64,
    pattern: &str,
    entry_type: &str,
    dirs: &mut Vec<String>,
    files: &mut Vec<String>,
    truncated: &mut bool,
) {
    if dirs.len() + files.len() >= MAX_RESULTS {
        *truncated = true;
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        if path.is_dir() {
            if is_excluded_dir(&name) {
                continue;
            }
            if (entry_type == "any" || entry_type == "directory") && glob_like_match(pattern, &name) {
                dirs.push(format!("{relative}/"));
            }
            if depth + 1 < max_depth {
                walk(root, &path, depth + 1, max_depth, pattern, entry_type, dirs, files, truncated);
            }
        } else if (entry_type == "any" || entry_type == "file") && glob_like_match(pattern, &name) {
            files.push(relative);
        }
        if dirs.len() + files.len() >= MAX_RESULTS {
            *truncated = true;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::SafetyMode;

    fn ctx(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(dir.to_path_buf(), SafetyMode::AutoApply)
    }

    #[tokio::test]
    async fn test_file_search_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        std::fs::write(dir.path().join("b.md"), "").unwrap();
        let handler = FileSearchHandler;
        let call = ToolCall::new("file_search").with_param("pattern", json!("*.rs"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { output, metadata } => {
                assert!(output.contains("a.rs"));
                assert!(!output.contains("b.md"));
                assert_eq!(metadata.get("count"), Some(&json!(1)));
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_file_search_type_directory_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub_match")).unwrap();
        std::fs::write(dir.path().join("sub_match_file.txt"), "").unwrap();
        let handler = FileSearchHandler;
        let call = ToolCall::new("file_search")
            .with_param("pattern", json!("sub_match"))
            .with_param("type", json!("directory"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { output, .. } => {
                assert!(output.contains("sub_match/"));
                assert!(!output.contains("sub_match_file.txt"));
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_file_search_respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        std::fs::write(dir.path().join("a/b/c/deep.rs"), "").unwrap();
        let handler = FileSearchHandler;
        let call = ToolCall::new("file_search")
            .with_param("pattern", json!("*.rs"))
            .with_param("max_depth", json!(1));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { output, .. } => assert!(!output.contains("deep.rs")),
            _ => panic!("expected success"),
        }
    }
}
