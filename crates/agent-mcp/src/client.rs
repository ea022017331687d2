//! JSON-RPC 2.0 client over a single MCP server's stdio, matching the
//! pump-task-owns-its-state shape the teacher's MCP hub applies to its own
//! proxied connections, adapted here to a single in-process child rather
//! than a socket-served registry.

use agent_core::{ExecutionContext, ParamType, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use agent_tools::ToolHandler;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("failed to spawn mcp server '{server}': {source}")]
    Spawn { server: String, source: std::io::Error },
    #[error("mcp request '{method}' to '{server}' timed out after {secs}s")]
    Timeout { server: String, method: String, secs: u64 },
    #[error("mcp server '{server}' closed its connection")]
    ServerClosed { server: String },
    #[error("mcp protocol error: {0}")]
    Protocol(String),
}

/// One JSON-RPC exchange a caller wants dispatched to the pump task.
struct OutboundRequest {
    id: u64,
    payload: Value,
    respond_to: oneshot::Sender<Result<Value, McpError>>,
}

/// A live connection to one MCP server.
pub struct McpClient {
    pub server_name: String,
    next_id: AtomicU64,
    outbound: mpsc::UnboundedSender<OutboundRequest>,
}

impl McpClient {
    /// Spawn `command args`, start the pump task, and run the `initialize`
    /// handshake described in the MCP lifecycle.
    pub async fn connect(
        server_name: impl Into<String>,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: Option<&std::path::Path>,
    ) -> Result<Self, McpError> {
        let server_name = server_name.into();
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| McpError::Spawn {
            server: server_name.clone(),
            source: e,
        })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(server_name.clone(), child, stdin, stdout, outbound_rx));

        let client = Self {
            server_name: server_name.clone(),
            next_id: AtomicU64::new(1),
            outbound: outbound_tx,
        };

        client
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "agent-cli", "version": env!("CARGO_PKG_VERSION")},
                }),
            )
            .await?;
        client.notify("notifications/initialized", json!({}))?;

        Ok(client)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let (tx, rx) = oneshot::channel();
        self.outbound
            .send(OutboundRequest { id, payload, respond_to: tx })
            .map_err(|_| McpError::ServerClosed { server: self.server_name.clone() })?;

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(McpError::ServerClosed { server: self.server_name.clone() }),
            Err(_) => Err(McpError::Timeout {
                server: self.server_name.clone(),
                method: method.to_string(),
                secs: REQUEST_TIMEOUT.as_secs(),
            }),
        }
    }

    fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        // Notifications carry no id and expect no response; piggy-back on the
        // request channel with an id the pump never has to answer.
        let payload = json!({"jsonrpc": "2.0", "method": method, "params": params});
        let (tx, _rx) = oneshot::channel();
        self.outbound
            .send(OutboundRequest { id: 0, payload, respond_to: tx })
            .map_err(|_| McpError::ServerClosed { server: self.server_name.clone() })
    }

    /// Discover the server's tools and adapt each into an internal
    /// [`ToolDefinition`] named `mcp_<server>_<remote-name>`.
    pub async fn list_tools(&self) -> Result<Vec<(ToolDefinition, String)>, McpError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(|v| v.as_array())
            .ok_or_else(|| McpError::Protocol("tools/list response missing 'tools' array".to_string()))?;

        let mut adapted = Vec::new();
        for tool in tools {
            let Some(remote_name) = tool.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let description = tool
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let parameters = adapt_input_schema(tool.get("inputSchema"));
            let definition = ToolDefinition {
                name: format!("mcp_{}_{}", self.server_name, remote_name),
                description,
                parameters,
                safe: false,
            };
            adapted.push((definition, remote_name.to_string()));
        }
        Ok(adapted)
    }

    /// Invoke `tools/call` for `remote_name` with `arguments`, flattening the
    /// response's `content` text parts into a single output string.
    pub async fn call_tool(&self, remote_name: &str, arguments: Value) -> Result<ToolResult, McpError> {
        let result = self
            .request("tools/call", json!({"name": remote_name, "arguments": arguments}))
            .await?;

        let is_error = result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false);
        let text = result
            .get("content")
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if is_error {
            Ok(ToolResult::failure(text))
        } else {
            Ok(ToolResult::success(text))
        }
    }
}

/// JSON-Schema `type` values map directly onto [`ParamType`] except
/// `integer`, which collapses into `number`.
fn adapt_input_schema(schema: Option<&Value>) -> Vec<ToolParameter> {
    let Some(schema) = schema else {
        return Vec::new();
    };
    let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let param_type = match prop.get("type").and_then(|v| v.as_str()) {
                Some("integer") | Some("number") => ParamType::Number,
                Some("boolean") => ParamType::Boolean,
                Some("array") => ParamType::Array,
                Some("object") => ParamType::Object,
                _ => ParamType::String,
            };
            let description = prop.get("description").and_then(|v| v.as_str()).unwrap_or("").to_string();
            if required.contains(&name.as_str()) {
                ToolParameter::required(name.clone(), param_type, description)
            } else {
                ToolParameter::optional(name.clone(), param_type, description)
            }
        })
        .collect()
}

/// Owns the child, the stdin writer, and the pending-response table. Nothing
/// outside this task ever touches the pending map: requests arrive over
/// `outbound_rx`, responses are dispatched by id as frames are read.
async fn pump(
    server_name: String,
    mut child: Child,
    mut stdin: tokio::process::ChildStdin,
    stdout: tokio::process::ChildStdout,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundRequest>,
) {
    let mut reader = BufReader::new(stdout);
    let mut pending: HashMap<u64, oneshot::Sender<Result<Value, McpError>>> = HashMap::new();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    None => break,
                    Some(req) => {
                        if req.id != 0 {
                            pending.insert(req.id, req.respond_to);
                        }
                        if let Err(e) = write_frame(&mut stdin, &req.payload).await {
                            tracing::warn!(server = server_name, error = %e, "failed writing mcp request");
                            break;
                        }
                    }
                }
            }
            frame = read_frame(&mut reader) => {
                match frame {
                    Ok(Some(value)) => dispatch(&mut pending, value),
                    Ok(None) => {
                        tracing::debug!(server = server_name, "mcp server stdout closed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(server = server_name, error = %e, "mcp framing error");
                        break;
                    }
                }
            }
        }
    }

    // Drop every still-pending sender so every outstanding receiver resolves
    // to a closed-channel error uniformly, matching a timeout's effect.
    pending.clear();
    let _ = child.start_kill();
}

fn dispatch(pending: &mut HashMap<u64, oneshot::Sender<Result<Value, McpError>>>, value: Value) {
    let Some(id) = value.get("id").and_then(|v| v.as_u64()) else {
        return; // notification from the server; nothing to correlate
    };
    let Some(sender) = pending.remove(&id) else {
        return;
    };
    if let Some(error) = value.get("error") {
        let _ = sender.send(Err(McpError::Protocol(error.to_string())));
    } else {
        let _ = sender.send(Ok(value.get("result").cloned().unwrap_or(Value::Null)));
    }
}

async fn write_frame(stdin: &mut tokio::process::ChildStdin, payload: &Value) -> std::io::Result<()> {
    let body = serde_json::to_vec(payload).expect("jsonrpc payload always serializes");
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    stdin.write_all(header.as_bytes()).await?;
    stdin.write_all(&body).await?;
    stdin.flush().await
}

/// Reads one JSON-RPC message, auto-detecting LSP `Content-Length` framing
/// versus newline-delimited JSON by inspecting the first line.
async fn read_frame(reader: &mut BufReader<tokio::process::ChildStdout>) -> std::io::Result<Option<Value>> {
    let mut first_line = String::new();
    let n = reader.read_line(&mut first_line).await?;
    if n == 0 {
        return Ok(None);
    }
    let trimmed = first_line.trim_end();

    if let Some(len_str) = trimmed.strip_prefix("Content-Length:") {
        let len: usize = len_str
            .trim()
            .parse()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "bad Content-Length"))?;
        // consume remaining headers up to the blank line
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            if line.trim_end().is_empty() {
                break;
            }
        }
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        let value = serde_json::from_slice(&body)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Some(value))
    } else {
        let value = serde_json::from_str(trimmed)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Some(value))
    }
}

/// Adapts one MCP remote tool into the local [`ToolHandler`] contract: every
/// invocation forwards to `tools/call` on the owning client.
pub struct McpToolHandler {
    pub client: std::sync::Arc<McpClient>,
    pub remote_name: String,
}

#[async_trait]
impl ToolHandler for McpToolHandler {
    async fn invoke(&self, call: &ToolCall, _ctx: &ExecutionContext) -> ToolResult {
        let arguments = serde_json::to_value(&call.params).unwrap_or(json!({}));
        match self.client.call_tool(&self.remote_name, arguments).await {
            Ok(result) => result,
            Err(e) => ToolResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_input_schema_maps_integer_to_number() {
        let schema = json!({
            "properties": {
                "count": {"type": "integer"},
                "label": {"type": "string"},
            },
            "required": ["count"],
        });
        let params = adapt_input_schema(Some(&schema));
        let count = params.iter().find(|p| p.name == "count").unwrap();
        assert!(matches!(count.param_type, ParamType::Number));
        assert!(count.required);
        let label = params.iter().find(|p| p.name == "label").unwrap();
        assert!(!label.required);
    }

    #[test]
    fn test_adapt_input_schema_empty_when_absent() {
        assert!(adapt_input_schema(None).is_empty());
    }

    #[test]
    fn test_dispatch_resolves_pending_request() {
        let mut pending = HashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(1u64, tx);
        dispatch(&mut pending, json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}}));
        let result = rx.try_recv().unwrap().unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[test]
    fn test_dispatch_ignores_notifications_without_id() {
        let mut pending = HashMap::new();
        dispatch(&mut pending, json!({"jsonrpc": "2.0", "method": "notifications/progress"}));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_dispatch_resolves_error_as_err() {
        let mut pending = HashMap::new();
        let (tx, mut rx) = oneshot::channel();
        pending.insert(2u64, tx);
        dispatch(&mut pending, json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -1, "message": "bad"}}));
        assert!(rx.try_recv().unwrap().is_err());
    }
}
