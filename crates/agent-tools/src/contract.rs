//! A tool is a definition plus a boxed handler, matching the pattern the
//! teacher's registries use to hold heterogeneous handlers behind one trait
//! object.

use agent_core::{ExecutionContext, ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;

/// Implemented once per built-in or MCP-adapted tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, call: &ToolCall, ctx: &ExecutionContext) -> ToolResult;
}

/// A registered tool: its static contract plus the handler that runs it.
pub struct Tool {
    pub definition: ToolDefinition,
    pub handler: Box<dyn ToolHandler>,
}

impl Tool {
    pub fn new(definition: ToolDefinition, handler: impl ToolHandler + 'static) -> Self {
        Self {
            definition,
            handler: Box::new(handler),
        }
    }
}
