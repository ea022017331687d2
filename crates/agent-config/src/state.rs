//! Per-user state directory: persisted defaults, REPL history, debug log.

use agent_core::AgentError;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Paths under the per-user state directory. None are created eagerly;
/// callers create parent directories on first write.
#[derive(Clone, Debug)]
pub struct StateDirs {
    pub config_json: PathBuf,
    pub history_txt: PathBuf,
    pub debug_log: PathBuf,
}

impl StateDirs {
    /// Resolve the platform-conventional state directory for `app_name`
    /// (XDG_CONFIG_HOME on Linux, roaming app-data on Windows, `~/Library/Application Support` on macOS).
    pub fn resolve(app_name: &str) -> Result<Self, AgentError> {
        let dirs = ProjectDirs::from("", "", app_name).ok_or_else(|| {
            AgentError::ConfigInvalid(
                "could not resolve a home directory for per-user state".to_string(),
            )
        })?;
        let base = dirs.config_dir();
        Ok(Self {
            config_json: base.join("config.json"),
            history_txt: base.join("history.txt"),
            debug_log: base.join("debug").join("llm-response.log"),
        })
    }

    /// True when `AGENT_DEBUG` (or the app-specific `{APP}_DEBUG`) is set,
    /// gating whether the debug log should be written.
    pub fn debug_enabled(app_name: &str) -> bool {
        std::env::var_os("AGENT_DEBUG").is_some()
            || std::env::var_os(format!("{}_DEBUG", app_name.to_uppercase())).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_produces_distinct_paths() {
        let dirs = StateDirs::resolve("agent").unwrap();
        assert_ne!(dirs.config_json, dirs.history_txt);
        assert!(dirs.debug_log.ends_with("llm-response.log"));
        assert!(dirs.config_json.ends_with("config.json"));
    }

    #[test]
    fn test_debug_enabled_respects_env_var() {
        unsafe {
            std::env::remove_var("AGENT_DEBUG");
        }
        assert!(!StateDirs::debug_enabled("agent"));
        unsafe {
            std::env::set_var("AGENT_DEBUG", "1");
        }
        assert!(StateDirs::debug_enabled("agent"));
        unsafe {
            std::env::remove_var("AGENT_DEBUG");
        }
    }
}
