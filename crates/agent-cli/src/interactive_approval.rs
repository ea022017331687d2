use agent_tools::{ApprovalDecision, ApprovalPrompt};
use async_trait::async_trait;
use std::io::Write;

/// Prompts on stdin/stderr for each unsafe call in `review` mode. `y` approves,
/// `n` denies, `q` quits the whole turn.
pub struct InteractiveApproval;

#[async_trait]
impl ApprovalPrompt for InteractiveApproval {
    async fn ask(&self, tool_name: &str, summary: &str, preview: &str) -> ApprovalDecision {
        eprintln!("--- approval required: {tool_name} ---");
        eprintln!("{summary}");
        if !preview.is_empty() {
            eprintln!("{preview}");
        }
        eprint!("approve? [y/N/q] ");
        std::io::stderr().flush().ok();

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            return ApprovalDecision::Deny;
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => ApprovalDecision::Approve,
            "q" | "quit" => ApprovalDecision::Quit,
            _ => ApprovalDecision::Deny,
        }
    }
}

/// Confirms an MCP server whose launcher isn't on the built-in allow-list.
/// Non-interactive environments (no stdin) are treated as declined, per the
/// "skip with a warning" rule for unattended runs.
pub fn confirm_launcher(server: &str, command: &str) -> bool {
    eprint!("mcp server '{server}' uses an unrecognized launcher '{command}'; start it? [y/N] ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
