//! Error types for workspace and subprocess operations.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of execution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command ran but exited unsuccessfully
    Exit,
    /// The command could not be started at all
    Spawn,
    /// The executable could not be located
    BinaryNotFound,
    /// Reading or writing the workspace failed
    Workspace,
}

impl ErrorKind {
    /// Get actionable advice for resolving this error kind.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Exit => "Inspect the command output above and re-run",
            Self::Spawn => "Check that the executable is runnable by the current user",
            Self::BinaryNotFound => "Install the tool or point its override variable at the binary",
            Self::Workspace => "Check free disk space and temp directory permissions",
        }
    }
}

/// Errors raised while running external commands or touching a workspace.
#[derive(Debug, Error)]
pub enum Error {
    /// Command exited non-zero
    #[error("command `{command}` exited with {}:\n{output}", status_label(*.code))]
    Exit {
        /// Rendered command line
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Combined stdout and stderr
        output: String,
    },

    /// Command could not be spawned
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Executable missing from PATH and not overridden
    #[error("`{0}` not found in PATH")]
    BinaryNotFound(String),

    /// Workspace IO failure
    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        /// Path being read or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

fn status_label(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Exit { .. } => ErrorKind::Exit,
            Error::Spawn { .. } => ErrorKind::Spawn,
            Error::BinaryNotFound(_) => ErrorKind::BinaryNotFound,
            Error::Workspace { .. } => ErrorKind::Workspace,
        }
    }

    /// Build a workspace error for `path`.
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Captured output of a failed command, if this error carries one.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::Exit { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result type for execution operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_error_message_includes_output() {
        let err = Error::Exit {
            command: "bosh create-env".to_string(),
            code: Some(1),
            output: "Deploying:\n  boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bosh create-env"));
        assert!(msg.contains("status 1"));
        assert!(msg.contains("boom"));
        assert_eq!(err.kind(), ErrorKind::Exit);
        assert_eq!(err.output(), Some("Deploying:\n  boom"));
    }

    #[test]
    fn test_signal_exit_label() {
        let err = Error::Exit {
            command: "terraform apply".to_string(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            Error::BinaryNotFound("bosh".into()).kind(),
            ErrorKind::BinaryNotFound
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = Error::workspace("/tmp/x", io);
        assert_eq!(err.kind(), ErrorKind::Workspace);
        assert!(err.output().is_none());
        assert!(err.kind().advice().contains("disk space"));
    }
}
