//! Director session lifecycle.
//!
//! A [`DirectorSession`] moves through
//! `Uninitialized → WorkspacePrepared → {Deploying | Deleting} → {Completed | Failed}`.
//! Any error moves it to `Failed`, which is terminal: a retry needs a fresh
//! session so it starts from persisted state rather than half-written files.

use crate::error::{Error, Result};
use crate::{
    CLOUD_CONFIG_FILENAME, Director, MANIFEST_FILENAME, PEM_FILENAME, STATE_FILENAME,
    create_env_args, delete_env_args, deploy_args, update_cloud_config_args,
    upload_stemcell_args, verify_converged,
};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle phase of a director session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing written yet
    Uninitialized,
    /// Key, manifest and any prior state are in the workspace
    WorkspacePrepared,
    /// Converge has started
    Deploying,
    /// Delete has started
    Deleting,
    /// Last operation succeeded
    Completed,
    /// An operation failed; the session cannot be reused
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::WorkspacePrepared => "prepared",
            Phase::Deploying => "deploying",
            Phase::Deleting => "deleting",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Generated inputs a session needs before it can converge or delete.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// Private key for the director VM
    pub private_key: Vec<u8>,
    /// Director deployment manifest
    pub manifest: Vec<u8>,
    /// Cloud configuration, written when it is applied
    pub cloud_config: Vec<u8>,
}

/// Deploy/delete view of a director used by teardown and simple callers.
pub trait DirectorClient {
    /// Converge the director and apply cloud config, returning the new state.
    fn deploy_director(&mut self) -> Result<Vec<u8>>;

    /// Delete the director. On failure the error carries any state left on disk.
    fn delete_director(&mut self) -> Result<()>;

    /// Release the session workspace.
    fn cleanup(&mut self) -> Result<()>;
}

/// Sequences [`Director`] primitives for one deploy or delete.
pub struct DirectorSession<D: Director> {
    director: D,
    phase: Phase,
    manifest_path: Option<PathBuf>,
    cloud_config: Vec<u8>,
}

impl<D: Director> DirectorSession<D> {
    /// Wrap a director; nothing is written until [`prepare`](Self::prepare).
    pub fn new(director: D) -> Self {
        Self {
            director,
            phase: Phase::Uninitialized,
            manifest_path: None,
            cloud_config: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Borrow the underlying director.
    pub fn director(&self) -> &D {
        &self.director
    }

    /// Path of the state file inside the workspace.
    pub fn state_path(&self) -> PathBuf {
        self.director.path_of(STATE_FILENAME)
    }

    /// Write the private key, prior state (only when there is one) and manifest.
    pub fn prepare(&mut self, artifacts: Artifacts, prior_state: Option<&[u8]>) -> Result<()> {
        self.expect(Phase::Uninitialized, "prepare the workspace")?;
        let result = self.write_inputs(&artifacts, prior_state);
        if result.is_ok() {
            self.cloud_config = artifacts.cloud_config;
        }
        self.settle(result, Phase::WorkspacePrepared)
    }

    fn write_inputs(&mut self, artifacts: &Artifacts, prior_state: Option<&[u8]>) -> Result<()> {
        self.director.save_file(PEM_FILENAME, &artifacts.private_key)?;
        if let Some(state) = prior_state {
            self.director.save_file(STATE_FILENAME, state)?;
        }
        let manifest = self.director.save_file(MANIFEST_FILENAME, &artifacts.manifest)?;
        self.manifest_path = Some(manifest);
        Ok(())
    }

    /// Run `create-env`, verify it converged and return the state file bytes.
    pub fn converge(&mut self) -> Result<Vec<u8>> {
        self.expect(Phase::WorkspacePrepared, "converge the director")?;
        self.phase = Phase::Deploying;
        let result = self.run_converge();
        self.settle(result, Phase::Deploying)
    }

    fn run_converge(&self) -> Result<Vec<u8>> {
        let args = create_env_args(&self.manifest_path(), &self.state_path());
        log::info!("Converging director");
        let converged = self
            .director
            .run_command(&args)
            .and_then(|output| verify_converged(&output));
        if let Err(source) = converged {
            return Err(Error::ConvergeFailed {
                source: Box::new(source),
                partial_state: self.leftover_state("converge"),
            });
        }

        self.director
            .read_file(STATE_FILENAME)?
            .ok_or_else(|| Error::MissingState(self.state_path().display().to_string()))
    }

    /// Write and apply the cloud configuration. Only valid after a verified converge.
    pub fn update_cloud_config(&mut self) -> Result<()> {
        self.expect(Phase::Deploying, "update cloud config")?;
        let result = self
            .director
            .save_file(CLOUD_CONFIG_FILENAME, &self.cloud_config)
            .and_then(|path| {
                log::info!("Updating cloud config");
                self.director
                    .run_authenticated_command(&update_cloud_config_args(&path))
            });
        self.settle(result.map(drop), Phase::Deploying)
    }

    /// Upload a stemcell to the converged director.
    pub fn upload_stemcell(&mut self, url: &str) -> Result<()> {
        self.expect(Phase::Deploying, "upload a stemcell")?;
        log::info!("Uploading stemcell {url}");
        let result = self
            .director
            .run_authenticated_command(&upload_stemcell_args(url));
        self.settle(result.map(drop), Phase::Deploying)
    }

    /// Write `manifest` as `<deployment>.yml` and deploy it.
    pub fn deploy_application(&mut self, deployment: &str, manifest: &[u8]) -> Result<()> {
        self.expect(Phase::Deploying, "deploy an application")?;
        let filename = format!("{deployment}.yml");
        let result = self.director.save_file(&filename, manifest).and_then(|path| {
            log::info!("Deploying {deployment}");
            self.director
                .run_authenticated_command(&deploy_args(deployment, &path))
        });
        self.settle(result.map(drop), Phase::Deploying)
    }

    /// Mark the deploy finished.
    pub fn complete(&mut self) -> Result<()> {
        self.expect(Phase::Deploying, "complete")?;
        self.phase = Phase::Completed;
        Ok(())
    }

    /// Mark the session failed; used when a step outside the director fails.
    pub fn fail(&mut self) {
        self.phase = Phase::Failed;
    }

    /// State file left on disk by a failed `operation`, if it can be read.
    fn leftover_state(&self, operation: &str) -> Option<Vec<u8>> {
        match self.director.read_file(STATE_FILENAME) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Could not read director state after failed {operation}: {e}");
                None
            }
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.director.path_of(MANIFEST_FILENAME))
    }

    fn expect(&self, phase: Phase, operation: &'static str) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(Error::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn settle<T>(&mut self, result: Result<T>, next: Phase) -> Result<T> {
        self.phase = if result.is_ok() { next } else { Phase::Failed };
        result
    }
}

impl<D: Director> DirectorClient for DirectorSession<D> {
    fn deploy_director(&mut self) -> Result<Vec<u8>> {
        let state = self.converge()?;
        self.update_cloud_config()?;
        self.complete()?;
        Ok(state)
    }

    fn delete_director(&mut self) -> Result<()> {
        self.expect(Phase::WorkspacePrepared, "delete the director")?;
        self.phase = Phase::Deleting;
        let args = delete_env_args(&self.manifest_path(), &self.state_path());
        log::info!("Deleting director");

        match self.director.run_command(&args) {
            Ok(_) => {
                self.phase = Phase::Completed;
                Ok(())
            }
            Err(source) => {
                self.phase = Phase::Failed;
                Err(Error::DeleteFailed {
                    source: Box::new(source),
                    partial_state: self.leftover_state("delete"),
                })
            }
        }
    }

    fn cleanup(&mut self) -> Result<()> {
        self.director.cleanup()
    }
}
