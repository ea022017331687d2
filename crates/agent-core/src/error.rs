/// Classification of an error for transcript reporting and exit-code mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownTool,
    MissingParameter,
    PolicyReject,
    PathInvalid,
    Io,
    PatchFormat,
    CommandTimeout,
    McpTimeout,
    ModelStreamInterrupt,
    ContextTooLarge,
    MaxIterations,
    ConsecutiveFailures,
    ConfigInvalid,
    RegistrationCollision,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnknownTool => "unknown_tool",
            Self::MissingParameter => "missing_parameter",
            Self::PolicyReject => "policy_reject",
            Self::PathInvalid => "path_invalid",
            Self::Io => "io",
            Self::PatchFormat => "patch_format",
            Self::CommandTimeout => "command_timeout",
            Self::McpTimeout => "mcp_timeout",
            Self::ModelStreamInterrupt => "model_stream_interrupt",
            Self::ContextTooLarge => "context_too_large",
            Self::MaxIterations => "max_iterations",
            Self::ConsecutiveFailures => "consecutive_failures",
            Self::ConfigInvalid => "config_invalid",
            Self::RegistrationCollision => "registration_collision",
        };
        write!(f, "{s}")
    }
}

/// Shared error taxonomy used across crates for tool, MCP, and orchestrator failures.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{tool}' missing required parameter '{param}'")]
    MissingParameter { tool: String, param: String },

    #[error("policy rejected '{action}': {reason}")]
    PolicyReject { action: String, reason: String },

    #[error("invalid path '{path}': {reason}")]
    PathInvalid { path: String, reason: String },

    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed patch: {0}")]
    PatchFormat(String),

    #[error("command timed out after {secs}s: {command}")]
    CommandTimeout { command: String, secs: u64 },

    #[error("mcp server '{server}' timed out waiting for response to '{method}'")]
    McpTimeout { server: String, method: String },

    #[error("model stream interrupted: {0}")]
    ModelStreamInterrupt(String),

    #[error("context too large: {tokens} tokens exceeds budget of {budget}")]
    ContextTooLarge { tokens: usize, budget: usize },

    #[error("reached maximum iterations ({0})")]
    MaxIterations(u32),

    #[error("tool '{tool}' failed {count} times consecutively")]
    ConsecutiveFailures { tool: String, count: u32 },

    #[error("invalid workspace configuration: {0}")]
    ConfigInvalid(String),

    #[error("tool '{0}' is already registered")]
    RegistrationCollision(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::MissingParameter { .. } => ErrorKind::MissingParameter,
            Self::PolicyReject { .. } => ErrorKind::PolicyReject,
            Self::PathInvalid { .. } => ErrorKind::PathInvalid,
            Self::Io { .. } => ErrorKind::Io,
            Self::PatchFormat(_) => ErrorKind::PatchFormat,
            Self::CommandTimeout { .. } => ErrorKind::CommandTimeout,
            Self::McpTimeout { .. } => ErrorKind::McpTimeout,
            Self::ModelStreamInterrupt(_) => ErrorKind::ModelStreamInterrupt,
            Self::ContextTooLarge { .. } => ErrorKind::ContextTooLarge,
            Self::MaxIterations(_) => ErrorKind::MaxIterations,
            Self::ConsecutiveFailures { .. } => ErrorKind::ConsecutiveFailures,
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            Self::RegistrationCollision(_) => ErrorKind::RegistrationCollision,
        }
    }

    /// True for errors that should terminate the orchestrator loop rather than
    /// surface as a failed `ToolResult` to the model.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MaxIterations
                | ErrorKind::ConsecutiveFailures
                | ErrorKind::ConfigInvalid
                | ErrorKind::ContextTooLarge
                | ErrorKind::ModelStreamInterrupt
        )
    }
}
