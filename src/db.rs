//! SQL against the deployment's database server.

use crate::error::{Error, Result};
use execkit::{Invocation, ProcessRunner};
use std::path::PathBuf;

/// Environment variable overriding the psql binary location.
pub const ENV_BIN: &str = "STACKUP_PSQL_BIN";

/// Runs one SQL statement against the database server.
pub trait DbRunner {
    fn run(&self, sql: &str) -> Result<()>;
}

/// The statement a deploy issues for the application database.
pub fn create_database_sql(db_name: &str) -> String {
    format!("CREATE DATABASE {db_name};")
}

/// Whether `err` is the server refusing to create a database that exists.
pub fn is_already_exists(err: &Error) -> bool {
    match err {
        Error::Database(source) => source
            .output()
            .is_some_and(|output| output.contains("already exists")),
        _ => false,
    }
}

/// Connection details for [`PsqlRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
}

/// [`DbRunner`] that shells out to `psql`.
pub struct PsqlRunner<R: ProcessRunner> {
    binary: PathBuf,
    runner: R,
    connection: Connection,
}

impl<R: ProcessRunner> PsqlRunner<R> {
    pub fn new(binary: impl Into<PathBuf>, runner: R, connection: Connection) -> Self {
        Self {
            binary: binary.into(),
            runner,
            connection,
        }
    }

    fn invocation(&self, sql: &str) -> Invocation {
        let c = &self.connection;
        Invocation::new(&self.binary)
            .args(["-h", c.host.as_str(), "-p", c.port.as_str(), "-U", c.username.as_str()])
            .args(["-d", "postgres", "-v", "ON_ERROR_STOP=1", "-c", sql])
            .env("PGPASSWORD", c.password.clone())
    }
}

impl<R: ProcessRunner> DbRunner for PsqlRunner<R> {
    fn run(&self, sql: &str) -> Result<()> {
        log::debug!("Running SQL on {}: {sql}", self.connection.host);
        self.runner
            .run(&self.invocation(sql))
            .map(drop)
            .map_err(Error::Database)
    }
}

/// Locate psql (`STACKUP_PSQL_BIN`, then `psql` on PATH).
pub fn find_cli() -> Result<PathBuf> {
    execkit::find_binary("psql", ENV_BIN).map_err(Error::Database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use execkit::CommandOutput;
    use std::cell::RefCell;

    struct RecordingRunner {
        calls: RefCell<Vec<Invocation>>,
        stderr: Option<&'static str>,
    }

    impl ProcessRunner for RecordingRunner {
        fn execute(&self, invocation: &Invocation) -> execkit::Result<CommandOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(match self.stderr {
                None => CommandOutput::ok("CREATE DATABASE\n"),
                Some(stderr) => CommandOutput {
                    stderr: stderr.as_bytes().to_vec(),
                    combined: stderr.as_bytes().to_vec(),
                    code: Some(1),
                    ..Default::default()
                },
            })
        }
    }

    fn connection() -> Connection {
        Connection {
            host: "rds.aws.com".into(),
            port: "5432".into(),
            username: "admin".into(),
            password: "s3cret".into(),
        }
    }

    #[test]
    fn test_create_database_sql() {
        assert_eq!(create_database_sql("concourse_atc"), "CREATE DATABASE concourse_atc;");
    }

    #[test]
    fn test_psql_invocation() {
        let runner = RecordingRunner {
            calls: RefCell::new(Vec::new()),
            stderr: None,
        };
        let psql = PsqlRunner::new("psql", &runner, connection());
        psql.run("CREATE DATABASE concourse_atc;").unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(
            calls[0].args.join(" "),
            "-h rds.aws.com -p 5432 -U admin -d postgres -v ON_ERROR_STOP=1 -c CREATE DATABASE concourse_atc;"
        );
        assert_eq!(calls[0].env, vec![("PGPASSWORD".to_string(), "s3cret".to_string())]);
        assert!(!calls[0].display().contains("s3cret"));
    }

    #[test]
    fn test_already_exists_detected() {
        let runner = RecordingRunner {
            calls: RefCell::new(Vec::new()),
            stderr: Some("ERROR:  database \"concourse_atc\" already exists\n"),
        };
        let psql = PsqlRunner::new("psql", &runner, connection());
        let err = psql.run("CREATE DATABASE concourse_atc;").unwrap_err();
        assert!(is_already_exists(&err));
        assert_eq!(err.kind(), crate::error::ErrorKind::ProcessExecution);
    }

    #[test]
    fn test_other_failure_not_already_exists() {
        let runner = RecordingRunner {
            calls: RefCell::new(Vec::new()),
            stderr: Some("psql: error: connection refused\n"),
        };
        let psql = PsqlRunner::new("psql", &runner, connection());
        let err = psql.run("CREATE DATABASE concourse_atc;").unwrap_err();
        assert!(!is_already_exists(&err));
    }
}
