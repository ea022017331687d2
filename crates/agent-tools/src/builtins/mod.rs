//! Built-in tool handlers: the fixed set the CLI registers before any MCP
//! server contributes more.

pub mod apply_diff;
pub mod common;
pub mod file_search;
pub mod grep_search;
pub mod list_directory;
pub mod read_file;
pub mod run_command;
pub mod write_file;

use crate::contract::Tool;
use agent_safety::SafetyPolicy;

/// Construct every built-in tool, wiring `run_command` to the given policy.
pub fn all_builtin_tools(policy: SafetyPolicy) -> Vec<Tool> {
    vec![
        Tool::new(read_file::definition(), read_file::ReadFileHandler),
        Tool::new(write_file::definition(), write_file::WriteFileHandler),
        Tool::new(list_directory::definition(), list_directory::ListDirectoryHandler),
        Tool::new(run_command::definition(), run_command::RunCommandHandler::new(policy)),
        Tool::new(apply_diff::definition(), apply_diff::ApplyDiffHandler),
        Tool::new(grep_search::definition(), grep_search::GrepSearchHandler),
        Tool::new(file_search::definition(), file_search::FileSearchHandler),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_tools_have_unique_names() {
        let tools = all_builtin_tools(SafetyPolicy::default());
        let mut names: Vec<&str> = tools.iter().map(|t| t.definition.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_all_builtin_tools_count() {
        assert_eq!(all_builtin_tools(SafetyPolicy::default()).len(), 7);
    }
}
