//! Workspace configuration loading and per-user state directory resolution.

pub mod state;
pub mod workspace;

pub use state::StateDirs;
pub use workspace::{resolve_safety_mode, McpServerSpec, WorkspaceConfig};
