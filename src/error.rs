use std::process::ExitCode;

/// Errors that cause label-worker to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed (exit {code}): {message}")]
    ToolFailed {
        tool: String,
        code: i32,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitError::Config(_) => ExitCode::from(2),
            ExitError::ToolNotFound { .. } => ExitCode::from(3),
            ExitError::ToolFailed { .. } => ExitCode::from(4),
            ExitError::Other(_) => ExitCode::from(1),
        }
    }
}

/// A remote call through the gateway failed.
///
/// The gateway never retries; callers decide whether the failure aborts a
/// tick or only the current item.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{tool} not found on PATH")]
    NotFound { tool: String },

    #[error("`{command}` failed (exit {code}): {message}")]
    Failed {
        command: String,
        code: i32,
        message: String,
    },

    #[error("`{command}` returned malformed output: {detail}")]
    Malformed { command: String, detail: String },

    #[error("`{command}` could not be run: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<TransportError> for ExitError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound { tool } => ExitError::ToolNotFound { tool },
            TransportError::Failed {
                command,
                code,
                message,
            } => ExitError::ToolFailed {
                tool: command,
                code,
                message,
            },
            other => ExitError::Other(other.to_string()),
        }
    }
}
