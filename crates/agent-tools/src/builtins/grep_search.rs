use crate::builtins::common::{is_binary_path, is_excluded_dir, matches_any_include};
use crate::contract::ToolHandler;
use agent_core::{ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

const MAX_MATCHES: usize = 200;
const MAX_LINE_CHARS: usize = 500;

pub struct GrepSearchHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "grep_search".to_string(),
        description: "Search file contents under the workspace for a regex or fixed string.".to_string(),
        parameters: vec![
            ToolParameter::required("pattern", ParamType::String, "pattern to search for"),
            ToolParameter::optional("path", ParamType::String, "directory to search")
                .with_default(json!(".")),
            ToolParameter::optional("include", ParamType::String, "comma-separated glob filter"),
            ToolParameter::optional("fixed_strings", ParamType::Boolean, "treat pattern as a literal string"),
            ToolParameter::optional("case_sensitive", ParamType::Boolean, "match case-sensitively"),
        ],
        safe: true,
    }
}

#[async_trait]
impl ToolHandler for GrepSearchHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(pattern) = call.get_str("pattern") else {
            return ToolResult::failure("missing required parameter 'pattern'");
        };
        let path_str = call.get_str("path").unwrap_or(".");
        let include = call.get_str("include");
        let fixed_strings = call.params.get("fixed_strings").and_then(|v| v.as_bool()).unwrap_or(false);
        let case_sensitive = call.params.get("case_sensitive").and_then(|v| v.as_bool()).unwrap_or(false);

        let pattern_text = if fixed_strings { regex::escape(pattern) } else { pattern.to_string() };
        let regex = match RegexBuilder::new(&pattern_text)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(r) => r,
            Err(e) => return ToolResult::failure(format!("invalid pattern: {e}")),
        };

        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        let mut matches = Vec::new();
        let mut truncated = false;
        walk(&resolved, include, &regex, &mut matches, &mut truncated);
        matches.sort();

        let mut metadata = HashMap::new();
        metadata.insert("count".to_string(), json!(matches.len()));
        metadata.insert("truncated".to_string(), json!(truncated));
        ToolResult::success_with_metadata(matches.join("\n"), metadata)
    }
}

fn walk(dir: &Path, include: Option<&str>, regex: &Regex, out: &mut Vec<String>, truncated: &mut bool) {
    if *truncated || out.len() >= MAX_MATCHES {
        *truncated = true;
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if is_excluded_dir(&name) {
                continue;
            }
            walk(&path, include, regex, out, truncated);
        } else {
            if is_binary_path(&path) || !matches_any_include(include, &name) {
                continue;
            }
            search_file(&path, regex, out, truncated);
        }
        if out.len() >= MAX_MATCHES {
            *truncated = true;
            return;
        }
    }
}

fn search_file(path: &Path, regex: &Regex, out: &mut Vec<String>, truncated: &mut bool) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for (idx, line) in content.lines().enumerate() {
        if regex.is_match(line) {
            let mut truncated_line = line.to_string();
            if truncated_line.len() > MAX_LINE_CHARS {
                truncated_line.truncate(MAX_LINE_CHARS);
            }
            out.push(format!("{}:{}: {}", path.display(), idx + 1, truncated_line));
            if out.len() >= MAX_MATCHES {
                *truncated = true;
                return;
            }
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
    async fn test_grep_finds_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nlet needle = 1;\n").unwrap();
        let handler = GrepSearchHandler;
        let call = ToolCall::new("grep_search").with_param("pattern", json!("needle"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { output, metadata } => {
                assert!(output.contains("needle"));
                assert_eq!(metadata.get("count"), Some(&json!(1)));
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_grep_fixed_strings_escapes_metachars() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a.b.c\n").unwrap();
        let handler = GrepSearchHandler;
        let call = ToolCall::new("grep_search")
            .with_param("pattern", json!("a.b"))
            .with_param("fixed_strings", json!(true));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { metadata, .. } => assert_eq!(metadata.get("count"), Some(&json!(1))),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_grep_skips_excluded_dirs_and_binaries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/x.rs"), "needle\n").unwrap();
        std::fs::write(dir.path().join("image.png"), "needle\n").unwrap();
        let handler = GrepSearchHandler;
        let call = ToolCall::new("grep_search").with_param("pattern", json!("needle"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { metadata, .. } => assert_eq!(metadata.get("count"), Some(&json!(0))),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_grep_respects_include_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "needle\n").unwrap();
        std::fs::write(dir.path().join("a.md"), "needle\n").unwrap();
        let handler = GrepSearchHandler;
        let call = ToolCall::new("grep_search")
            .with_param("pattern", json!("needle"))
            .with_param("include", json!("*.rs"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { metadata, .. } => assert_eq!(metadata.get("count"), Some(&json!(1))),
            _ => panic!("expected success"),
        }
    }
}
