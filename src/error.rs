//! Error taxonomy for deploy and destroy runs.
//!
//! Every failure maps onto an [`ErrorKind`]. Only failures in the director
//! phase of a destroy are downgraded to a warning; everything else is fatal.

use thiserror::Error;

/// What went wrong, independent of which component reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Config missing, corrupt or invalid
    ConfigLoad,
    /// An external command exited non-zero or could not start
    ProcessExecution,
    /// Converge exited cleanly but did not report success
    Verification,
    /// Workspace or store read/write failure
    Persistence,
    /// Director deletion failed during destroy
    RecoverableDirector,
    /// Infrastructure provisioning failed
    Provisioner,
    /// A director client was used outside its lifecycle
    InvalidPhase,
}

impl ErrorKind {
    /// Whether destroy may continue past this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RecoverableDirector)
    }

    /// Short label for terminal output.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ConfigLoad => "Configuration error",
            Self::ProcessExecution => "Command failed",
            Self::Verification => "Director did not converge",
            Self::Persistence => "Could not read or write state",
            Self::RecoverableDirector => "Director deletion failed",
            Self::Provisioner => "Infrastructure error",
            Self::InvalidPhase => "Internal sequencing error",
        }
    }
}

/// Errors raised by the orchestration engine and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Config could not be loaded or failed validation
    #[error("config error: {0}")]
    ConfigLoad(String),

    /// Director CLI failure
    #[error(transparent)]
    Director(#[from] directorkit::Error),

    /// Provisioner failure
    #[error(transparent)]
    Provisioner(#[from] infrakit::Error),

    /// SQL statement failed
    #[error("database error: {0}")]
    Database(#[source] execkit::Error),

    /// Store read/write failure
    #[error("{context}: {source}")]
    Persistence {
        /// What was being read or written
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Manifest rendering failed
    #[error("failed to render {name}: {source}")]
    Manifest {
        /// Which artifact
        name: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    /// Build a persistence error.
    pub fn persistence(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Persistence {
            context: context.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigLoad(_) => ErrorKind::ConfigLoad,
            Error::Director(e) => match e.kind() {
                directorkit::ErrorKind::ProcessExecution => ErrorKind::ProcessExecution,
                directorkit::ErrorKind::Verification => ErrorKind::Verification,
                directorkit::ErrorKind::Persistence => ErrorKind::Persistence,
                directorkit::ErrorKind::DeleteFailed => ErrorKind::RecoverableDirector,
                directorkit::ErrorKind::InvalidPhase => ErrorKind::InvalidPhase,
            },
            Error::Provisioner(_) => ErrorKind::Provisioner,
            Error::Database(_) => ErrorKind::ProcessExecution,
            Error::Persistence { .. } | Error::Manifest { .. } => ErrorKind::Persistence,
        }
    }

    /// What the operator can do about this error, when a component knows.
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Error::Director(e) => Some(e.kind().advice()),
            Error::Database(e) | Error::Provisioner(infrakit::Error::Exec(e)) => {
                Some(e.kind().advice())
            }
            _ => None,
        }
    }

    /// State bytes a failed director converge or deletion left behind.
    pub fn partial_state(&self) -> Option<&[u8]> {
        match self {
            Error::Director(e) => e.partial_state(),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_director_kinds_map_onto_taxonomy() {
        let verification = Error::from(directorkit::Error::Verification {
            markers: directorkit::SUCCESS_MARKERS,
        });
        assert_eq!(verification.kind(), ErrorKind::Verification);

        let delete = Error::from(directorkit::Error::DeleteFailed {
            source: Box::new(directorkit::Error::WorkspaceReleased),
            partial_state: Some(b"B".to_vec()),
        });
        assert_eq!(delete.kind(), ErrorKind::RecoverableDirector);
        assert!(delete.kind().is_recoverable());
        assert_eq!(delete.partial_state(), Some(&b"B"[..]));

        let exit = Error::from(directorkit::Error::Exec(execkit::Error::Exit {
            command: "bosh create-env".into(),
            code: Some(1),
            output: String::new(),
        }));
        assert_eq!(exit.kind(), ErrorKind::ProcessExecution);
        assert!(!exit.kind().is_recoverable());
        assert_eq!(
            delete.advice(),
            Some("Re-run destroy; the remaining director state has been kept")
        );
    }

    #[test]
    fn test_other_kinds() {
        assert_eq!(Error::ConfigLoad("x".into()).kind(), ErrorKind::ConfigLoad);
        let io = std::io::Error::other("disk full");
        assert_eq!(
            Error::persistence("writing asset", io).kind(),
            ErrorKind::Persistence
        );
        let db = Error::Database(execkit::Error::BinaryNotFound("psql".into()));
        assert_eq!(db.kind(), ErrorKind::ProcessExecution);
        assert!(db.partial_state().is_none());
        assert_eq!(
            db.advice(),
            Some("Install the tool or point its override variable at the binary")
        );
        assert!(Error::ConfigLoad("x".into()).advice().is_none());
    }
}
