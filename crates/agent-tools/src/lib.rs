//! Tool contract, parser, registry, executor, and built-in tool handlers.

pub mod backup;
pub mod builtins;
pub mod contract;
pub mod executor;
pub mod parser;
pub mod registry;

pub use backup::{Backup, BackupStore};
pub use contract::{Tool, ToolHandler};
pub use executor::{
    ApprovalDecision, ApprovalPrompt, AutoApprove, AutoDeny, ScriptedPrompt, ToolExecutor,
};
pub use parser::{parse_tool_calls, ParsedOutput};
pub use registry::ToolRegistry;
