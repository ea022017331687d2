use agent_core::SafetyMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agent", version, about = "Interactive coding agent driven by a tool-calling LLM loop")]
pub struct Cli {
    /// One-shot prompt. If omitted, starts an interactive REPL reading lines from stdin.
    pub prompt: Option<String>,

    /// Approval policy for unsafe tool calls.
    #[arg(long = "mode", value_enum)]
    pub mode: Option<SafetyModeArg>,

    /// Workspace root; defaults to the current directory.
    #[arg(long, value_name = "path")]
    pub workspace: Option<PathBuf>,

    /// Maximum orchestrator iterations per turn before giving up.
    #[arg(long, value_name = "n")]
    pub max_iterations: Option<u32>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum SafetyModeArg {
    DryRun,
    Review,
    AutoApply,
}

impl From<SafetyModeArg> for SafetyMode {
    fn from(value: SafetyModeArg) -> Self {
        match value {
            SafetyModeArg::DryRun => SafetyMode::DryRun,
            SafetyModeArg::Review => SafetyMode::Review,
            SafetyModeArg::AutoApply => SafetyMode::AutoApply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parses_one_shot_prompt() {
        let cli = Cli::parse_from(["agent", "fix the bug"]);
        assert_eq!(cli.prompt.as_deref(), Some("fix the bug"));
    }

    #[test]
    fn test_parses_mode_flag() {
        let cli = Cli::parse_from(["agent", "--mode", "auto-apply", "do it"]);
        assert!(matches!(cli.mode, Some(SafetyModeArg::AutoApply)));
    }

    #[test]
    fn test_repl_mode_when_prompt_omitted() {
        let cli = Cli::parse_from(["agent"]);
        assert!(cli.prompt.is_none());
    }
}
