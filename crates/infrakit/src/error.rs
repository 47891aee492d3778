//! Error types for provisioning operations.

use thiserror::Error;

/// Categories of provisioner errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// terraform exited non-zero or could not be started
    Process,
    /// Outputs were missing or unparseable
    Metadata,
    /// Workspace or config rendering failed
    Io,
}

/// Errors that can occur while provisioning infrastructure.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying command or workspace failure
    #[error(transparent)]
    Exec(#[from] execkit::Error),

    /// `terraform output -json` did not include a required output
    #[error("terraform output `{0}` is missing; has the infrastructure been applied?")]
    MissingOutput(String),

    /// JSON parsing or rendering failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Exec(e) => match e.kind() {
                execkit::ErrorKind::Workspace => ErrorKind::Io,
                _ => ErrorKind::Process,
            },
            Error::MissingOutput(_) | Error::Json(_) => ErrorKind::Metadata,
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
