use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Role tag of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single entry in the transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Safety mode controlling the approval policy applied to unsafe tool calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyMode {
    /// No handler is ever invoked; calls short-circuit with a dry-run notice.
    DryRun,
    /// Unsafe tools require interactive approval; safe tools run unprompted.
    #[default]
    Review,
    /// All tools run without prompting.
    AutoApply,
}

impl std::str::FromStr for SafetyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry-run" => Ok(Self::DryRun),
            "review" => Ok(Self::Review),
            "auto-apply" => Ok(Self::AutoApply),
            other => Err(format!(
                "invalid safety mode '{other}': expected one of dry-run, review, auto-apply"
            )),
        }
    }
}

impl std::fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Review => write!(f, "review"),
            Self::AutoApply => write!(f, "auto-apply"),
        }
    }
}

/// Immutable per-session execution context threaded through the executor.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub workspace_root: PathBuf,
    pub mode: SafetyMode,
    pub verbose: bool,
}

impl ExecutionContext {
    pub fn new(workspace_root: PathBuf, mode: SafetyMode) -> Self {
        Self {
            workspace_root,
            mode,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Semantic type of a declared tool parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// One declared parameter of a tool definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ToolParameter {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Static, serializable description of a tool's contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    /// Pure read-only, side-effect-free operation; bypasses approval prompts.
    pub safe: bool,
}

impl ToolDefinition {
    pub fn find_param(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Tool call extracted from model output: a name plus a decoded parameter map.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }
}

/// Outcome of invoking a tool handler.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        output: String,
        #[serde(default)]
        metadata: HashMap<String, serde_json::Value>,
    },
    Failure {
        error: String,
    },
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn success_with_metadata(
        output: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self::Success {
            output: output.into(),
            metadata,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_safety_mode_from_str() {
        assert_eq!(SafetyMode::from_str("dry-run").unwrap(), SafetyMode::DryRun);
        assert_eq!(SafetyMode::from_str("review").unwrap(), SafetyMode::Review);
        assert_eq!(
            SafetyMode::from_str("auto-apply").unwrap(),
            SafetyMode::AutoApply
        );
        assert!(SafetyMode::from_str("yolo").is_err());
    }

    #[test]
    fn test_safety_mode_display_roundtrip() {
        for mode in [SafetyMode::DryRun, SafetyMode::Review, SafetyMode::AutoApply] {
            let s = mode.to_string();
            assert_eq!(SafetyMode::from_str(&s).unwrap(), mode);
        }
    }

    #[test]
    fn test_safety_mode_default_is_review() {
        assert_eq!(SafetyMode::default(), SafetyMode::Review);
    }

    #[test]
    fn test_tool_call_get_str() {
        let call = ToolCall::new("read_file").with_param("path", serde_json::json!("hello.txt"));
        assert_eq!(call.get_str("path"), Some("hello.txt"));
        assert_eq!(call.get_str("missing"), None);
    }

    #[test]
    fn test_tool_result_is_success() {
        assert!(ToolResult::success("ok").is_success());
        assert!(!ToolResult::failure("bad").is_success());
    }

    #[test]
    fn test_message_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_tool_definition_find_param() {
        let def = ToolDefinition {
            name: "read_file".into(),
            description: "reads a file".into(),
            parameters: vec![ToolParameter::required(
                "path",
                ParamType::String,
                "path to read",
            )],
            safe: true,
        };
        assert!(def.find_param("path").is_some());
        assert!(def.find_param("missing").is_none());
    }

    #[test]
    fn test_execution_context_with_verbose() {
        let ctx = ExecutionContext::new(PathBuf::from("/tmp/ws"), SafetyMode::AutoApply)
            .with_verbose(true);
        assert!(ctx.verbose);
        assert_eq!(ctx.mode, SafetyMode::AutoApply);
    }
}
