pub mod error;
pub mod types;

pub use error::{AgentError, ErrorKind};
pub use types::{
    ExecutionContext, Message, ParamType, Role, SafetyMode, ToolCall, ToolDefinition,
    ToolParameter, ToolResult,
};
