//! Command and path safety checks applied before any tool handler runs.
//!
//! Two independent guards: [`policy`] classifies commands and arguments as
//! permitted or forbidden; [`path`] confines filesystem access to a
//! workspace root and blocks a fixed list of sensitive directories.

pub mod path;
pub mod policy;

pub use path::validate_path;
pub use policy::{check_command, SafetyPolicy};
