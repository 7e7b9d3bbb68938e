use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading, validating or building a run.
/// Any of these stops the run before a single command executes.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Unknown target role: {0}")]
    UnknownRole(String),

    #[error("Unsupported runner kind: {0}")]
    UnsupportedRunner(String),

    #[error("Invalid parameter keys detected: {0:?}")]
    InvalidParameterKey(Vec<String>),

    #[error("Command template {index} declares no roles")]
    EmptyRoles { index: u32 },

    #[error("Expected exactly one manager target, found {found}")]
    ManagerCardinality { found: usize },

    #[error("Missing value for placeholder {{{key}}} in '{template}'")]
    MissingParameter { key: String, template: String },

    #[error("Unknown placeholder {{{name}}} in '{template}'")]
    UnknownPlaceholder { name: String, template: String },

    #[error("Capture of {key} from {target}#{index} failed: {reason}")]
    CaptureFailed {
        key: String,
        target: String,
        index: u32,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a single command. Never escapes the coordinator: it is recorded
/// in the run report and shown on the status sink.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Command '{command}' failed with return code {return_code}: {stderr}")]
pub struct CommandExecutionError {
    pub command: String,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandExecutionError {
    /// Failure reported by the command itself (non-zero exit, non-2xx reply).
    pub fn failed(
        command: impl Into<String>,
        return_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            return_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The command did not finish within `timeout`.
    pub fn timed_out(command: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::failed(command, -1, "", format!("timed out after {:?}", timeout))
    }

    /// Anything else: spawn failures, broken pipes, transport errors.
    pub fn unexpected(command: impl Into<String>, fault: impl std::fmt::Display) -> Self {
        Self::failed(command, -1, "", format!("unexpected error: {}", fault))
    }

    pub fn is_timeout(&self) -> bool {
        self.return_code == -1 && self.stderr.starts_with("timed out after")
    }
}
