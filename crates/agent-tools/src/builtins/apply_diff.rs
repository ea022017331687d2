use crate::contract::ToolHandler;
use agent_core::{AgentError, ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

pub struct ApplyDiffHandler;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "apply_diff".to_string(),
        description: "Apply a unified diff hunk set to a file within the workspace.".to_string(),
        parameters: vec![
            ToolParameter::required("path", ParamType::String, "path to patch, relative to the workspace root"),
            ToolParameter::required("diff", ParamType::String, "unified diff text"),
            ToolParameter::optional("create_backup", ParamType::Boolean, "write a .backup sibling before overwriting")
                .with_default(json!(true)),
        ],
        safe: false,
    }
}

#[async_trait]
impl ToolHandler for ApplyDiffHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(path_str) = call.get_str("path") else {
            return ToolResult::failure("missing required parameter 'path'");
        };
        let Some(diff_text) = call.get_str("diff") else {
            return ToolResult::failure("missing required parameter 'diff'");
        };
        let create_backup = call
            .params
            .get("create_backup")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        if !diff_text.contains("@@") {
            return ToolResult::failure(
                AgentError::PatchFormat("diff contains no hunk header ('@@')".to_string()).to_string(),
            );
        }

        let resolved = match agent_safety::validate_path(path_str, &ctx.workspace_root) {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(e.to_string()),
        };

        let file_created = !resolved.exists();
        let original = if file_created {
            String::new()
        } else {
            match std::fs::read_to_string(&resolved) {
                Ok(s) => s,
                Err(e) => {
                    return ToolResult::failure(
                        AgentError::Io {
                            path: path_str.to_string(),
                            source: e,
                        }
                        .to_string(),
                    )
                }
            }
        };

        let patched = match apply_unified_diff(&original, diff_text) {
            Ok(p) => p,
            Err(reason) => return ToolResult::failure(AgentError::PatchFormat(reason).to_string()),
        };

        let mut backup_path: Option<String> = None;
        if create_backup {
            let backup = resolved.with_extension(format!(
                "{}.backup",
                resolved.extension().and_then(|e| e.to_str()).unwrap_or("")
            ));
            if std::fs::write(&backup, &original).is_ok() {
                backup_path = Some(backup.display().to_string());
            }
        }

        if let Err(e) = std::fs::write(&resolved, &patched) {
            if let Some(ref backup) = backup_path {
                let _ = std::fs::copy(backup, &resolved);
            }
            return ToolResult::failure(
                AgentError::Io {
                    path: path_str.to_string(),
                    source: e,
                }
                .to_string(),
            );
        }

        let (added, removed) = count_changes(diff_text);
        let mut metadata = HashMap::new();
        metadata.insert("linesAdded".to_string(), json!(added));
        metadata.insert("linesRemoved".to_string(), json!(removed));
        metadata.insert("originalSize".to_string(), json!(original.len()));
        metadata.insert("patchedSize".to_string(), json!(patched.len()));
        metadata.insert("fileCreated".to_string(), json!(file_created));
        metadata.insert("backup".to_string(), json!(backup_path));
        ToolResult::success_with_metadata(format!("patched {path_str}"), metadata)
    }
}

fn count_changes(diff_text: &str) -> (usize, usize) {
    let mut added = 0;
    let mut removed = 0;
    for line in diff_text.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('+') {
            let _ = stripped;
            added += 1;
        } else if let Some(stripped) = line.strip_prefix('-') {
            let _ = stripped;
            removed += 1;
        }
    }
    (added, removed)
}

/// Apply a minimal unified-diff hunk set to `original`. Hunks are trusted at
/// face value: context lines are consumed but never checked against
/// `original`'s actual content, matching a lenient patch applier rather than
/// a strict one.
fn apply_unified_diff(original: &str, diff_text: &str) -> Result<String, String> {
    let original_lines: Vec<&str> = if original.is_empty() {
        Vec::new()
    } else {
        original.split('\n').collect()
    };
    // split('\n') on a trailing-newline string leaves a spurious final "".
    let original_lines: &[&str] = if !original.is_empty() && original.ends_with('\n') {
        &original_lines[..original_lines.len() - 1]
    } else {
        &original_lines
    };

    let mut out: Vec<String> = Vec::new();
    let mut cursor = 0usize; // 0-based index into original_lines already emitted/consumed
    let mut any_hunk = false;

    for line in diff_text.lines() {
        if let Some(header) = parse_hunk_header(line) {
            any_hunk = true;
            let start = header.0.saturating_sub(1);
            while cursor < start && cursor < original_lines.len() {
                out.push(original_lines[cursor].to_string());
                cursor += 1;
            }
            cursor = start.min(original_lines.len());
            continue;
        }
        if !any_hunk {
            continue;
        }
        if line.starts_with("---") || line.starts_with("+++") || line.starts_with("\\") {
            continue;
        }
        if let Some(added) = line.strip_prefix('+') {
            out.push(added.to_string());
        } else if line.starts_with('-') {
            cursor += 1;
        } else {
            let context = line.strip_prefix(' ').unwrap_or(line);
            out.push(context.to_string());
            cursor += 1;
        }
    }

    if !any_hunk {
        return Err("no applicable hunks found in diff".to_string());
    }

    while cursor < original_lines.len() {
        out.push(original_lines[cursor].to_string());
        cursor += 1;
    }

    let trailing_newline = if original.is_empty() {
        true
    } else {
        original.ends_with('\n')
    };

    let mut result = out.join("\n");
    if trailing_newline && !result.is_empty() {
        result.push('\n');
    } else if trailing_newline && result.is_empty() {
        // preserve an originally-empty-but-newline-terminated file as empty
    }
    Ok(result)
}

fn parse_hunk_header(line: &str) -> Option<(usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (old_part, rest) = rest.split_once(" +")?;
    let (new_part, _) = rest.split_once(" @@")?;
    let old_start: usize = old_part.split(',').next()?.parse().ok()?;
    let new_start: usize = new_part.split(',').next()?.parse().ok()?;
    Some((old_start, new_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::SafetyMode;

    fn ctx(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(dir.to_path_buf(), SafetyMode::AutoApply)
    }

    #[test]
    fn test_parse_hunk_header() {
        assert_eq!(parse_hunk_header("@@ -1,3 +1,4 @@"), Some((1, 1)));
        assert_eq!(parse_hunk_header("@@ -0,0 +1,1 @@"), Some((0, 1)));
        assert_eq!(parse_hunk_header("not a hunk"), None);
    }

    #[test]
    fn test_apply_diff_to_existing_content() {
        let original = "a\nb\nc\n";
        let diff = "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let patched = apply_unified_diff(original, diff).unwrap();
        assert_eq!(patched, "a\nB\nc\n");
    }

    #[test]
    fn test_apply_diff_creates_new_file_content() {
        let diff = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,1 @@\n+hello\n";
        let patched = apply_unified_diff("", diff).unwrap();
        assert_eq!(patched, "hello\n");
    }

    #[test]
    fn test_apply_diff_rejects_missing_hunk_marker() {
        let diff_text = "not a real diff";
        let result = apply_unified_diff("a\n", diff_text);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handler_rejects_diff_without_at_marker() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ApplyDiffHandler;
        let call = ToolCall::new("apply_diff")
            .with_param("path", json!("a.txt"))
            .with_param("diff", json!("no markers here"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_handler_patches_existing_file_and_writes_backup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a\nb\nc\n").unwrap();
        let handler = ApplyDiffHandler;
        let call = ToolCall::new("apply_diff")
            .with_param("path", json!("a.txt"))
            .with_param("diff", json!("@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        assert!(result.is_success());
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a\nB\nc\n");
        assert!(dir.path().join("a.backup").exists() || dir.path().join("a.txt.backup").exists());
    }

    #[tokio::test]
    async fn test_handler_creates_new_file_from_diff() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ApplyDiffHandler;
        let call = ToolCall::new("apply_diff")
            .with_param("path", json!("new.txt"))
            .with_param("diff", json!("--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,1 @@\n+hello\n"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        assert!(result.is_success());
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "hello\n");
    }
}
