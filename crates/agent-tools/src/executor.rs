//! Resolve → validate → approve → invoke → report pipeline run per tool call.

use crate::registry::ToolRegistry;
use agent_core::{AgentError, ExecutionContext, ParamType, SafetyMode, ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use similar::{ChangeTag, TextDiff};
use std::path::Path;
use std::sync::Mutex;

const DIFF_PREVIEW_LINE_THRESHOLD: usize = 50;

/// Outcome of an interactive or scripted approval prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Deny,
    Quit,
}

/// Governs how `review`-mode calls to unsafe tools are confirmed. `d`-style
/// re-rendering of the preview is handled inside the implementation; callers
/// only see the final decision.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn ask(&self, tool_name: &str, summary: &str, preview: &str) -> ApprovalDecision;
}

/// Approves every call. Used in `auto-apply` mode and tests.
pub struct AutoApprove;

#[async_trait]
impl ApprovalPrompt for AutoApprove {
    async fn ask(&self, _tool_name: &str, _summary: &str, _preview: &str) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Denies every call. Useful for exercising the rejection path in tests.
pub struct AutoDeny;

#[async_trait]
impl ApprovalPrompt for AutoDeny {
    async fn ask(&self, _tool_name: &str, _summary: &str, _preview: &str) -> ApprovalDecision {
        ApprovalDecision::Deny
    }
}

/// Returns a fixed, pre-scripted sequence of decisions, one per call. Used
/// by tests that need to exercise a specific approve/deny/quit pattern.
pub struct ScriptedPrompt {
    decisions: Mutex<std::collections::VecDeque<ApprovalDecision>>,
}

impl ScriptedPrompt {
    pub fn new(decisions: impl IntoIterator<Item = ApprovalDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ApprovalPrompt for ScriptedPrompt {
    async fn ask(&self, _tool_name: &str, _summary: &str, _preview: &str) -> ApprovalDecision {
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ApprovalDecision::Deny)
    }
}

/// Runs tool calls through the resolve/validate/approve/invoke/report pipeline.
pub struct ToolExecutor {
    prompt: Box<dyn ApprovalPrompt>,
}

impl ToolExecutor {
    pub fn new(prompt: impl ApprovalPrompt + 'static) -> Self {
        Self {
            prompt: Box::new(prompt),
        }
    }

    pub async fn execute(
        &self,
        registry: &ToolRegistry,
        ctx: &ExecutionContext,
        call: &ToolCall,
    ) -> ToolResult {
        let Some(tool) = registry.get(&call.tool) else {
            return ToolResult::failure(AgentError::UnknownTool(call.tool.clone()).to_string());
        };

        for param in &tool.definition.parameters {
            if param.required && !call.params.contains_key(&param.name) {
                return ToolResult::failure(
                    AgentError::MissingParameter {
                        tool: call.tool.clone(),
                        param: param.name.clone(),
                    }
                    .to_string(),
                );
            }
        }

        let coerced = coerce_declared_numbers(call, &tool.definition);
        let call = &coerced;

        if ctx.mode == SafetyMode::DryRun {
            return ToolResult::success("DRY-RUN; no effect");
        }

        if ctx.mode == SafetyMode::Review && !tool.definition.safe {
            let preview = render_preview(call, ctx);
            let summary = format!("invoke '{}' with {} parameter(s)", call.tool, call.params.len());
            match self.prompt.ask(&call.tool, &summary, &preview).await {
                ApprovalDecision::Approve => {}
                ApprovalDecision::Deny => return ToolResult::failure("rejected by user"),
                ApprovalDecision::Quit => return ToolResult::failure("session terminated by user"),
            }
        }

        tool.handler.invoke(call, ctx).await
    }
}

/// The tag-format parser has no type information and always decodes a bare
/// numeric literal as a string (`parser.rs::decode_value`). Coerce any
/// parameter declared `Number` back into a JSON number here, once the
/// executor has the tool's definition in hand, so handlers (and MCP
/// `arguments` built from `call.params`) see the type the schema promises.
fn coerce_declared_numbers(call: &ToolCall, definition: &ToolDefinition) -> ToolCall {
    let mut coerced = call.clone();
    for param in &definition.parameters {
        if param.param_type != ParamType::Number {
            continue;
        }
        if let Some(Value::String(raw)) = coerced.params.get(&param.name) {
            if let Ok(i) = raw.parse::<i64>() {
                coerced.params.insert(param.name.clone(), json!(i));
            } else if let Ok(f) = raw.parse::<f64>() {
                coerced.params.insert(param.name.clone(), json!(f));
            }
        }
    }
    coerced
}

/// Diff-preview policy for write-like tools: a full unified diff under the
/// line threshold, otherwise `+N/-N` stats; "new file" when there's nothing
/// to diff against.
fn render_preview(call: &ToolCall, ctx: &ExecutionContext) -> String {
    if call.tool != "write_file" {
        return String::new();
    }
    let Some(path) = call.get_str("path") else {
        return String::new();
    };
    let Some(proposed) = call.get_str("content") else {
        return String::new();
    };
    let full_path = ctx.workspace_root.join(path);
    match std::fs::read_to_string(&full_path) {
        Err(_) => "new file".to_string(),
        Ok(existing) => render_diff(&existing, proposed),
    }
}

fn render_diff(existing: &str, proposed: &str) -> String {
    let diff = TextDiff::from_lines(existing, proposed);
    if existing.lines().count() < DIFF_PREVIEW_LINE_THRESHOLD {
        let mut out = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            out.push(sign);
            out.push_str(&change.to_string());
        }
        out
    } else {
        let (mut added, mut removed) = (0usize, 0usize);
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => added += 1,
                ChangeTag::Delete => removed += 1,
                ChangeTag::Equal => {}
            }
        }
        format!("+{added}/-{removed}")
    }
}

/// Read `path` relative to `workspace_root` and compute a unified-format
/// preview suitable for printing before a write is approved. Exposed for
/// callers that already have file content in hand (e.g. `apply_diff`).
pub fn diff_preview_for(workspace_root: &Path, path: &str, proposed: &str) -> String {
    let full = workspace_root.join(path);
    match std::fs::read_to_string(full) {
        Err(_) => "new file".to_string(),
        Ok(existing) => render_diff(&existing, proposed),
    }
}
