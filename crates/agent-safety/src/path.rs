//! Path normalization and confinement to a workspace root.

use agent_core::AgentError;
use std::path::{Component, Path, PathBuf};

/// Directories that are never valid targets for a tool, regardless of
/// whether they happen to lie under the workspace root.
fn sensitive_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/etc"),
        PathBuf::from("/sys"),
        PathBuf::from("/proc"),
        PathBuf::from("/boot"),
    ];
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        dirs.push(home.join(".ssh"));
        dirs.push(home.join(".gnupg"));
        dirs.push(home.join(".aws"));
        dirs.push(home.join(".azure"));
        dirs.push(home.join(".config").join("gcloud"));
    }
    if let Some(appdata) = std::env::var_os("APPDATA").map(PathBuf::from) {
        dirs.push(appdata);
    }
    dirs
}

/// Lexically normalize a path: collapse `.` components and resolve without
/// touching the filesystem (the target may not exist yet, as with `write_file`).
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Validate a user-provided path string against the workspace root.
///
/// Rejects empty input, embedded NUL bytes, and a literal `..` component.
/// Resolves relative paths against `workspace_root`, then confirms the
/// normalized result stays under the root and outside the sensitive
/// directory list. Returns the normalized absolute path on success.
pub fn validate_path(input: &str, workspace_root: &Path) -> Result<PathBuf, AgentError> {
    if input.is_empty() {
        return Err(AgentError::PathInvalid {
            path: input.to_string(),
            reason: "path is empty".to_string(),
        });
    }
    if input.contains('\0') {
        return Err(AgentError::PathInvalid {
            path: input.to_string(),
            reason: "path contains a NUL byte".to_string(),
        });
    }
    if Path::new(input)
        .components()
        .any(|c| c == Component::ParentDir)
    {
        return Err(AgentError::PathInvalid {
            path: input.to_string(),
            reason: "path contains a literal '..' component".to_string(),
        });
    }

    let candidate = Path::new(input);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace_root.join(candidate)
    };

    let normalized_root = normalize_lexical(workspace_root);
    let normalized = normalize_lexical(&joined);

    if !normalized.starts_with(&normalized_root) {
        return Err(AgentError::PathInvalid {
            path: input.to_string(),
            reason: "path escapes the workspace root".to_string(),
        });
    }

    for sensitive in sensitive_dirs() {
        if normalized.starts_with(&sensitive) {
            return Err(AgentError::PathInvalid {
                path: input.to_string(),
                reason: format!("path falls under sensitive directory '{}'", sensitive.display()),
            });
        }
    }

    Ok(normalized)
}
