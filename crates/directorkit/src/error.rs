//! Error types for director operations.
//!
//! Errors are categorized so callers can decide which failures are fatal.
//! A failed converge and a converge that exited cleanly without reporting
//! success are different problems, and a failed delete may still have left
//! state behind that must be kept.

use crate::session::Phase;
use thiserror::Error;

/// Categories of director errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The CLI exited non-zero or could not be started
    ProcessExecution,
    /// The CLI exited cleanly but did not report a converged director
    Verification,
    /// Workspace read/write failed, or expected state was missing
    Persistence,
    /// Deleting the director failed; partial state may be attached
    DeleteFailed,
    /// The client was used outside its lifecycle
    InvalidPhase,
}

impl ErrorKind {
    /// Get actionable advice for resolving this error kind.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ProcessExecution => "Inspect the command output above and re-run",
            Self::Verification => "Check the converge output; the director may be half-deployed",
            Self::Persistence => "Check free disk space and temp directory permissions",
            Self::DeleteFailed => "Re-run destroy; the remaining director state has been kept",
            Self::InvalidPhase => "Construct a fresh client before retrying",
        }
    }
}

/// Errors that can occur while driving a director.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying command or workspace failure
    #[error(transparent)]
    Exec(#[from] execkit::Error),

    /// Converge output contained none of the success markers
    #[error("couldn't find any of {} in director output", quoted(markers))]
    Verification {
        /// Markers that were searched for
        markers: &'static [&'static str],
    },

    /// State file was expected after a converge but is absent
    #[error("director state file {0} was not written by converge")]
    MissingState(String),

    /// Converging the director failed
    #[error("failed to converge director: {source}")]
    ConvergeFailed {
        /// Why the converge failed
        #[source]
        source: Box<Error>,
        /// State on disk after the failed attempt
        partial_state: Option<Vec<u8>>,
    },

    /// Deleting the director failed
    #[error("failed to delete director: {source}")]
    DeleteFailed {
        /// Why the delete failed
        #[source]
        source: Box<Error>,
        /// State left on disk after the failed attempt
        partial_state: Option<Vec<u8>>,
    },

    /// Operation attempted in the wrong lifecycle phase
    #[error("cannot {operation} while director client is {phase}")]
    InvalidPhase {
        /// What was attempted
        operation: &'static str,
        /// Phase the client was in
        phase: Phase,
    },

    /// Workspace already released
    #[error("director workspace has already been cleaned up")]
    WorkspaceReleased,
}

fn quoted(markers: &[&str]) -> String {
    markers
        .iter()
        .map(|m| format!("`{m}`"))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Exec(e) => match e.kind() {
                execkit::ErrorKind::Workspace => ErrorKind::Persistence,
                _ => ErrorKind::ProcessExecution,
            },
            Error::Verification { .. } => ErrorKind::Verification,
            Error::MissingState(_) | Error::WorkspaceReleased => ErrorKind::Persistence,
            Error::ConvergeFailed { source, .. } => source.kind(),
            Error::DeleteFailed { .. } => ErrorKind::DeleteFailed,
            Error::InvalidPhase { .. } => ErrorKind::InvalidPhase,
        }
    }

    /// State bytes recovered from a failed converge or delete.
    pub fn partial_state(&self) -> Option<&[u8]> {
        match self {
            Error::ConvergeFailed { partial_state, .. }
            | Error::DeleteFailed { partial_state, .. } => partial_state.as_deref(),
            _ => None,
        }
    }
}

/// Result type for director operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SUCCESS_MARKERS;

    #[test]
    fn test_verification_message_names_markers() {
        let err = Error::Verification {
            markers: SUCCESS_MARKERS,
        };
        assert_eq!(
            err.to_string(),
            "couldn't find any of `Finished deploying` or `Skipping deploy` in director output"
        );
        assert_eq!(err.kind(), ErrorKind::Verification);
    }

    #[test]
    fn test_exec_kinds() {
        let exit = Error::from(execkit::Error::Exit {
            command: "bosh create-env".into(),
            code: Some(1),
            output: String::new(),
        });
        assert_eq!(exit.kind(), ErrorKind::ProcessExecution);

        let io = std::io::Error::other("disk full");
        let ws = Error::from(execkit::Error::workspace("/tmp/ws", io));
        assert_eq!(ws.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_partial_state() {
        let err = Error::DeleteFailed {
            source: Box::new(Error::WorkspaceReleased),
            partial_state: Some(b"{ partial }".to_vec()),
        };
        assert_eq!(err.kind(), ErrorKind::DeleteFailed);
        assert_eq!(err.partial_state(), Some(&b"{ partial }"[..]));
        assert!(Error::WorkspaceReleased.partial_state().is_none());
    }

    #[test]
    fn test_converge_failure_keeps_source_kind() {
        let err = Error::ConvergeFailed {
            source: Box::new(Error::Verification {
                markers: SUCCESS_MARKERS,
            }),
            partial_state: Some(b"{ half }".to_vec()),
        };
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert_eq!(err.partial_state(), Some(&b"{ half }"[..]));
    }
}
