use crate::contract::ToolHandler;
use agent_core::{ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use agent_safety::SafetyPolicy;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

pub struct RunCommandHandler {
    policy: SafetyPolicy,
}

impl RunCommandHandler {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "run_command".to_string(),
        description: "Run a shell command inside the workspace under a wall-clock timeout."
            .to_string(),
        parameters: vec![
            ToolParameter::required("command", ParamType::String, "the command to execute"),
            ToolParameter::optional("args", ParamType::Array, "argument vector"),
            ToolParameter::optional("cwd", ParamType::String, "working directory override"),
        ],
        safe: false,
    }
}

#[async_trait]
impl ToolHandler for RunCommandHandler {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult {
        let Some(command) = call.get_str("command") else {
            return ToolResult::failure("missing required parameter 'command'");
        };
        let args: Vec<String> = call
            .params
            .get("args")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();

        if let Err(e) = agent_safety::check_command(&self.policy, command, &args) {
            return ToolResult::failure(e.to_string());
        }

        let workspace_root = match call.get_str("cwd") {
            Some(cwd) => match agent_safety::validate_path(cwd, &ctx.workspace_root) {
                Ok(p) => p,
                Err(e) => return ToolResult::failure(e.to_string()),
            },
            None => ctx.workspace_root.clone(),
        };

        let config = agent_process::RunnerConfig::new(workspace_root, ctx.mode.to_string())
            .with_timeout_ms(self.policy.max_duration_ms);

        match agent_process::run_command(&config, command, &args).await {
            Ok(output) if output.success() => {
                let mut metadata = HashMap::new();
                metadata.insert("exit_code".to_string(), json!(output.exit_code));
                metadata.insert("timed_out".to_string(), json!(output.timed_out));
                ToolResult::success_with_metadata(output.stdout, metadata)
            }
            Ok(output) => {
                let combined = format!("{}{}", output.stdout, output.stderr);
                let tail = agent_process::tail(&combined, 2000);
                let reason = if output.timed_out {
                    format!("command timed out after {}ms; tail:\n{tail}", self.policy.max_duration_ms)
                } else {
                    format!(
                        "command exited with status {:?}; tail:\n{tail}",
                        output.exit_code
                    )
                };
                ToolResult::failure(reason)
            }
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::SafetyMode;
    use std::path::PathBuf;

    fn ctx(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(dir.to_path_buf(), SafetyMode::AutoApply)
    }

    #[tokio::test]
    async fn test_run_command_success() {
        let dir = tempfile::tempdir().unwrap();
        let handler = RunCommandHandler::new(SafetyPolicy::default());
        let call = ToolCall::new("run_command")
            .with_param("command", json!("echo"))
            .with_param("args", json!(["hi"]));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        match result {
            ToolResult::Success { output, .. } => assert!(output.contains("hi")),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_run_command_denied_by_policy() {
        let dir = tempfile::tempdir().unwrap();
        let handler = RunCommandHandler::new(SafetyPolicy::default());
        let call = ToolCall::new("run_command").with_param("command", json!("rm"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let handler = RunCommandHandler::new(SafetyPolicy::default());
        let call = ToolCall::new("run_command").with_param("command", json!("false"));
        let result = handler.invoke(&call, &ctx(dir.path())).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_run_command_missing_param_fails() {
        let handler = RunCommandHandler::new(SafetyPolicy::default());
        let ctx = ExecutionContext::new(PathBuf::from("/tmp"), SafetyMode::AutoApply);
        let result = handler.invoke(&ToolCall::new("run_command"), &ctx).await;
        assert!(!result.is_success());
    }
}
