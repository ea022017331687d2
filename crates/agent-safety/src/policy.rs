//! Command-name and shell-metacharacter checks enforced before spawning a child.

use agent_core::AgentError;

/// Commands whose base name is always forbidden, regardless of allow-list.
const BUILTIN_DENYLIST: &[&str] = &[
    // destructive filesystem
    "rm", "dd", "mkfs", "shred", "format",
    // system control
    "shutdown", "reboot", "halt", "poweroff", "init",
    // package managers
    "apt", "apt-get", "yum", "dnf", "pacman", "brew", "npm", "pip", "pip3", "cargo",
    // privilege changing
    "sudo", "su", "doas", "chmod", "chown",
    // network fetch
    "curl", "wget", "nc", "netcat",
    // process killing
    "kill", "killall", "pkill",
];

/// Characters that never appear in a safe command token or argument, even
/// when the runner is configured to interpose a shell.
const FORBIDDEN_METACHARS: &[char] = &[';', '`', '\r', '\n'];
const FORBIDDEN_SUBSTRINGS: &[&str] = &["$(", "${", "||", "&&"];

const SCRIPT_EXTENSIONS: &[&str] = &[".exe", ".cmd", ".bat", ".ps1", ".sh"];

/// A safety policy governing which commands may run and for how long.
#[derive(Clone, Debug)]
pub struct SafetyPolicy {
    /// If non-empty, only these base names may run (authoritative over the built-in list).
    pub allow_list: Vec<String>,
    /// Base names that are always forbidden, on top of [`BUILTIN_DENYLIST`].
    pub deny_list: Vec<String>,
    /// Maximum command duration before the runner sends a termination signal.
    pub max_duration_ms: u64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            max_duration_ms: 5 * 60 * 1000,
        }
    }
}

/// Normalize a command string to its comparable base name: first whitespace
/// token, path tail, stripped script extension, lowercased.
pub fn normalize_command_name(command: &str) -> String {
    let first_token = command.split_whitespace().next().unwrap_or("");
    let tail = first_token
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(first_token);
    let mut lower = tail.to_lowercase();
    for ext in SCRIPT_EXTENSIONS {
        if let Some(stripped) = lower.strip_suffix(ext) {
            lower = stripped.to_string();
            break;
        }
    }
    lower
}

/// True if `value` contains a shell metacharacter forbidden in command tokens
/// or arguments, independent of whether the runner interposes a shell.
pub fn contains_forbidden_metachar(value: &str) -> bool {
    if value.chars().any(|c| FORBIDDEN_METACHARS.contains(&c)) {
        return true;
    }
    FORBIDDEN_SUBSTRINGS.iter().any(|pat| value.contains(pat))
}

/// Validate a command and its argument vector against the policy.
///
/// Checks the command-name allow/deny rules first, then the metacharacter
/// filter across the command token and every argument. Fails fast: the first
/// violation found is returned, no process is spawned either way.
pub fn check_command(
    policy: &SafetyPolicy,
    command: &str,
    args: &[String],
) -> Result<(), AgentError> {
    let base = normalize_command_name(command);

    let deny_hit = BUILTIN_DENYLIST.contains(&base.as_str())
        || policy
            .deny_list
            .iter()
            .any(|d| normalize_command_name(d) == base || d == command);
    if deny_hit {
        return Err(AgentError::PolicyReject {
            action: command.to_string(),
            reason: format!("command '{base}' is on the deny-list"),
        });
    }

    if !policy.allow_list.is_empty() {
        let allowed = policy
            .allow_list
            .iter()
            .any(|a| normalize_command_name(a) == base || a == command);
        if !allowed {
            return Err(AgentError::PolicyReject {
                action: command.to_string(),
                reason: format!("command '{base}' is not on the allow-list"),
            });
        }
    }

    if contains_forbidden_metachar(command) {
        return Err(AgentError::PolicyReject {
            action: command.to_string(),
            reason: "command token contains a forbidden shell metacharacter".to_string(),
        });
    }

    for arg in args {
        if contains_forbidden_metachar(arg) {
            return Err(AgentError::PolicyReject {
                action: format!("{command} {}", args.join(" ")),
                reason: format!("argument '{arg}' contains a forbidden shell metacharacter"),
            });
        }
    }

    Ok(())
}
