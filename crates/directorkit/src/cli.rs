//! Real director backend that spawns the orchestrator CLI.

use crate::error::{Error, Result};
use crate::{CA_CERT_FILENAME, DEFAULT_ARGS, Director, Endpoint, auth_args};
use execkit::{Invocation, ProcessRunner, Workspace};
use std::path::PathBuf;

/// Environment variable overriding the CLI binary location.
pub const ENV_BIN: &str = "STACKUP_BOSH_BIN";

/// Locate the director CLI (`STACKUP_BOSH_BIN`, then `bosh` on PATH).
pub fn find_cli() -> Result<PathBuf> {
    Ok(execkit::find_binary("bosh", ENV_BIN)?)
}

#[derive(Debug)]
struct Auth {
    endpoint: Endpoint,
    ca_cert_path: PathBuf,
}

/// Director backed by the real CLI binary.
///
/// Commands run from the workspace directory, since `create-env` keeps its
/// caches relative to the state file.
pub struct CliDirector<R: ProcessRunner> {
    binary: PathBuf,
    runner: R,
    workspace: Option<Workspace>,
    auth: Option<Auth>,
}

impl<R: ProcessRunner> CliDirector<R> {
    /// Create a director using `binary`, owning `workspace`.
    pub fn new(binary: impl Into<PathBuf>, runner: R, workspace: Workspace) -> Self {
        Self {
            binary: binary.into(),
            runner,
            workspace: Some(workspace),
            auth: None,
        }
    }

    /// Enable authenticated commands, writing the CA certificate into the workspace.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Result<Self> {
        let ca_cert_path = self.save_file(CA_CERT_FILENAME, endpoint.ca_cert.as_bytes())?;
        self.auth = Some(Auth {
            endpoint,
            ca_cert_path,
        });
        Ok(self)
    }

    fn workspace(&self) -> Result<&Workspace> {
        self.workspace.as_ref().ok_or(Error::WorkspaceReleased)
    }

    fn run(&self, args: &[String]) -> Result<String> {
        let workspace = self.workspace()?;
        let mut invocation = Invocation::new(&self.binary)
            .args(DEFAULT_ARGS)
            .args(args)
            .current_dir(workspace.path());
        if let Some(auth) = &self.auth {
            invocation = invocation.redact(auth.endpoint.client_secret.clone());
        }

        let output = self.runner.run(&invocation)?;
        Ok(output.combined_str())
    }
}

impl<R: ProcessRunner> Director for CliDirector<R> {
    fn save_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        Ok(self.workspace()?.write_file(name, contents)?)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.workspace
            .as_ref()
            .map_or_else(|| PathBuf::from(name), |ws| ws.path_of(name))
    }

    fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.workspace()?.read_file(name)?)
    }

    fn run_command(&self, args: &[String]) -> Result<String> {
        self.run(args)
    }

    fn run_authenticated_command(&self, args: &[String]) -> Result<String> {
        let auth = self.auth.as_ref().ok_or(Error::InvalidPhase {
            operation: "run an authenticated command",
            phase: crate::Phase::Uninitialized,
        })?;
        let mut full = auth_args(&auth.endpoint, &auth.ca_cert_path);
        full.extend_from_slice(args);
        self.run(&full)
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(workspace) = self.workspace.take() {
            workspace.cleanup()?;
        }
        Ok(())
    }
}
