//! Loads MCP server configs, spawns clients, and registers their discovered
//! tools into the shared registry. Registration collisions with another MCP
//! server are logged and skipped, per the non-fatal rule in §4.J; built-in
//! collisions are the registry's own problem and propagate as errors.

use crate::client::{McpClient, McpError, McpToolHandler};
use agent_config::McpServerSpec;
use agent_tools::{Tool, ToolRegistry};
use std::path::Path;
use std::sync::Arc;

/// Interpreters considered safe to launch without confirmation. Anything
/// else triggers an interactive prompt; a non-interactive caller (the
/// `confirm` closure returning `false`) causes that server to be skipped.
const LAUNCHER_ALLOW_LIST: &[&str] = &[
    "node", "npx", "python", "python3", "deno", "bun", "uvx", "docker",
];

pub struct McpManager {
    clients: Vec<Arc<McpClient>>,
}

impl McpManager {
    /// Spawn a client for every entry in `servers`, apply the launcher-safety
    /// check via `confirm` (called only for launchers outside the allow
    /// list), and register each discovered tool into `registry`.
    pub async fn start(
        servers: &std::collections::HashMap<String, McpServerSpec>,
        workspace_root: &Path,
        registry: &mut ToolRegistry,
        mut confirm: impl FnMut(&str, &str) -> bool,
    ) -> Self {
        let mut clients = Vec::new();

        for (name, spec) in servers {
            let base = launcher_base_name(&spec.command);
            if !LAUNCHER_ALLOW_LIST.contains(&base.as_str()) && !confirm(name, &spec.command) {
                tracing::warn!(server = name, command = %spec.command, "skipping mcp server: launcher not confirmed");
                continue;
            }

            let cwd = spec.cwd.as_deref().map(|c| workspace_root.join(c));
            let client = match McpClient::connect(name, &spec.command, &spec.args, &spec.env, cwd.as_deref()).await {
                Ok(c) => Arc::new(c),
                Err(e) => {
                    tracing::warn!(server = name, error = %e, "failed to start mcp server");
                    continue;
                }
            };

            match client.list_tools().await {
                Ok(tools) => {
                    for (definition, remote_name) in tools {
                        let tool_name = definition.name.clone();
                        let tool = Tool::new(
                            definition,
                            McpToolHandler { client: client.clone(), remote_name },
                        );
                        if let Err(e) = registry.register(tool) {
                            tracing::warn!(server = name, tool = tool_name, error = %e, "skipping colliding mcp tool");
                        }
                    }
                }
                Err(e) => tracing::warn!(server = name, error = %e, "failed to list mcp tools"),
            }

            clients.push(client);
        }

        Self { clients }
    }

    pub fn server_count(&self) -> usize {
        self.clients.len()
    }

    /// Terminate every client concurrently. Individual clients already kill
    /// their child on drop; this just makes the shutdown point explicit and
    /// parallel rather than incidental to scope exit order.
    pub async fn shutdown(self) {
        let _ = futures::future::join_all(self.clients.into_iter().map(|c| async move { drop(c) })).await;
    }
}

fn launcher_base_name(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or("")
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_lowercase()
}

#[allow(dead_code)]
fn is_timeout(err: &McpError) -> bool {
    matches!(err, McpError::Timeout { .. })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_base_name_strips_path() {
        assert_eq!(launcher_base_name("/usr/bin/node"), "node");
        assert_eq!(launcher_base_name("NPX --yes"), "npx");
    }

    #[tokio::test]
    async fn test_start_skips_unconfirmed_unknown_launcher() {
        let mut servers = std::collections::HashMap::new();
        servers.insert(
            "weird".to_string(),
            McpServerSpec { command: "some-custom-launcher".to_string(), ..Default::default() },
        );
        let mut registry = ToolRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let manager = McpManager::start(&servers, dir.path(), &mut registry, |_, _| false).await;
        assert_eq!(manager.server_count(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_start_with_no_servers_is_a_noop() {
        let servers = std::collections::HashMap::new();
        let mut registry = ToolRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let manager = McpManager::start(&servers, dir.path(), &mut registry, |_, _| true).await;
        assert_eq!(manager.server_count(), 0);
    }
}
