//! Shared walking/matching helpers for the search and listing tools.

use std::path::Path;

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "bmp", "pdf", "zip", "gz", "tar", "7z", "exe", "dll",
    "so", "dylib", "bin", "class", "jar", "woff", "woff2", "ttf", "otf", "mp3", "mp4", "mov",
    "wasm",
];

pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

pub fn is_binary_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BINARY_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// A small subset of glob syntax: `*.ext`, `**/*.ext`, `*name*`, or a plain
/// substring match when no wildcard is present.
pub fn glob_like_match(pattern: &str, candidate: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("**/*") {
        return candidate.ends_with(suffix);
    }
    if let Some(rest) = pattern.strip_prefix('*') {
        if let Some(inner) = rest.strip_suffix('*') {
            return candidate.contains(inner);
        }
        return candidate.ends_with(rest);
    }
    candidate.contains(pattern)
}

/// True if `filename` matches any pattern in a comma-separated include list.
/// `None` (no include filter configured) always matches.
pub fn matches_any_include(include: Option<&str>, filename: &str) -> bool {
    match include {
        None => true,
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .any(|pattern| glob_like_match(pattern, filename)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_suffix_match() {
        assert!(glob_like_match("*.rs", "main.rs"));
        assert!(!glob_like_match("*.rs", "main.py"));
    }

    #[test]
    fn test_glob_recursive_suffix_match() {
        assert!(glob_like_match("**/*.toml", "Cargo.toml"));
    }

    #[test]
    fn test_glob_contains_match() {
        assert!(glob_like_match("*test*", "my_test_file.rs"));
        assert!(!glob_like_match("*test*", "main.rs"));
    }

    #[test]
    fn test_glob_plain_substring() {
        assert!(glob_like_match("lib", "agent-lib-core"));
    }

    #[test]
    fn test_matches_any_include_none_matches_all() {
        assert!(matches_any_include(None, "anything.xyz"));
    }

    #[test]
    fn test_matches_any_include_comma_list() {
        assert!(matches_any_include(Some("*.rs, *.toml"), "Cargo.toml"));
        assert!(!matches_any_include(Some("*.rs, *.toml"), "README.md"));
    }

    #[test]
    fn test_is_excluded_dir() {
        assert!(is_excluded_dir("node_modules"));
        assert!(is_excluded_dir(".git"));
        assert!(!is_excluded_dir("src"));
    }

    #[test]
    fn test_is_binary_path() {
        assert!(is_binary_path(Path::new("photo.PNG")));
        assert!(!is_binary_path(Path::new("main.rs")));
    }
}
