//! `.{name}.yml` workspace configuration: loading is infallible for a
//! missing file and loud on malformed YAML.

use agent_core::{AgentError, SafetyMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One entry under `mcpServers` in the workspace config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct McpServerSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Parsed `.{name}.yml` at the workspace root. Every field is optional;
/// absence falls back to the built-in default noted per field.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default, rename = "testCommand")]
    pub test_command: Option<String>,
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: HashMap<String, McpServerSpec>,
    #[serde(default, rename = "includePaths")]
    pub include_paths: Vec<String>,
    #[serde(default, rename = "excludePaths")]
    pub exclude_paths: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "safetyMode")]
    pub safety_mode: Option<SafetyMode>,
}

impl WorkspaceConfig {
    /// Load `.{app_name}.yml` from `workspace_root`. A missing file yields
    /// [`WorkspaceConfig::default`]; a present-but-malformed file is a
    /// terminal [`AgentError::ConfigInvalid`].
    pub fn load(workspace_root: &Path, app_name: &str) -> Result<Self, AgentError> {
        let path = workspace_root.join(format!(".{app_name}.yml"));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(AgentError::ConfigInvalid(format!(
                    "failed to read '{}': {e}",
                    path.display()
                )))
            }
        };

        serde_yaml::from_str(&raw).map_err(|e| {
            AgentError::ConfigInvalid(format!("malformed YAML in '{}': {e}", path.display()))
        })
    }
}

/// Resolve the effective safety mode: CLI flag, then the `AGENT_SAFETY_MODE`
/// environment variable, then the workspace config's own default, then
/// [`SafetyMode::default`].
pub fn resolve_safety_mode(
    cli_flag: Option<SafetyMode>,
    workspace_default: Option<SafetyMode>,
) -> SafetyMode {
    if let Some(mode) = cli_flag {
        return mode;
    }
    if let Ok(raw) = std::env::var("AGENT_SAFETY_MODE") {
        if let Ok(mode) = raw.parse::<SafetyMode>() {
            return mode;
        }
        tracing::warn!(value = %raw, "ignoring unrecognized AGENT_SAFETY_MODE value");
    }
    workspace_default.unwrap_or_default()
}
