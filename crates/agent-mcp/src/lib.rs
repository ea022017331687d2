//! JSON-RPC client and manager for external Model Context Protocol tool
//! servers: one child process per server, discovered tools adapted into the
//! shared [`agent_tools::ToolRegistry`].

pub mod client;
pub mod manager;

pub use client::{McpClient, McpError, McpToolHandler};
pub use manager::McpManager;
