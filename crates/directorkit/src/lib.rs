//! # directorkit
//!
//! Drive a deployment-orchestrator director through its command-line tool.
//!
//! The crate is layered:
//!
//! - [`Director`] is the primitive surface: save files into the session
//!   workspace and run (optionally authenticated) CLI commands.
//!   [`cli::CliDirector`] implements it by spawning the real binary.
//! - [`DirectorSession`] sequences those primitives into converge, cloud
//!   config update, stemcell upload, application deploy and delete, tracking
//!   a lifecycle [`Phase`] so a failed session is never reused.
//! - [`DirectorClient`] is the narrow deploy/delete/cleanup view that
//!   teardown code depends on.
//!
//! ## Example
//!
//! ```no_run
//! use directorkit::{Artifacts, DirectorClient, DirectorSession, Endpoint};
//! use directorkit::cli::CliDirector;
//! use execkit::{SystemRunner, Workspace};
//!
//! let endpoint = Endpoint {
//!     url: "https://10.0.0.6:25555".into(),
//!     ca_cert: "-- CA --".into(),
//!     client: "admin".into(),
//!     client_secret: "secret".into(),
//! };
//! let director = CliDirector::new("bosh", SystemRunner::echoing(), Workspace::new("demo")?)
//!     .with_endpoint(endpoint)?;
//!
//! let mut session = DirectorSession::new(director);
//! session.prepare(
//!     Artifacts {
//!         private_key: b"-- KEY --".to_vec(),
//!         manifest: b"name: bosh".to_vec(),
//!         cloud_config: b"networks: []".to_vec(),
//!     },
//!     None,
//! )?;
//! let state = session.deploy_director()?;
//! session.cleanup()?;
//! # Ok::<(), directorkit::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod session;

pub use error::{Error, ErrorKind, Result};
pub use session::{Artifacts, DirectorClient, DirectorSession, Phase};

use std::path::{Path, PathBuf};

/// Private key used by the director VM.
pub const PEM_FILENAME: &str = "director.pem";
/// Director deployment manifest.
pub const MANIFEST_FILENAME: &str = "director.yml";
/// Cloud configuration document.
pub const CLOUD_CONFIG_FILENAME: &str = "cloud-config.yml";
/// CA certificate for authenticated commands.
pub const CA_CERT_FILENAME: &str = "ca-cert.pem";
/// Director state file, also the asset key it is persisted under.
pub const STATE_FILENAME: &str = "director-state.json";

/// Flags prefixed to every invocation: no prompts, no colour, tty-style output.
pub const DEFAULT_ARGS: &[&str] = &["--non-interactive", "--tty", "--no-color"];

/// Output markers that mean `create-env` converged.
pub const SUCCESS_MARKERS: &[&str] = &["Finished deploying", "Skipping deploy"];

/// Director endpoint and client credentials for authenticated commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Director URL, e.g. `https://1.2.3.4:25555`
    pub url: String,
    /// PEM-encoded CA certificate the director presents
    pub ca_cert: String,
    /// UAA client / director username
    pub client: String,
    /// Client secret / director password
    pub client_secret: String,
}

/// Primitive operations against one director, scoped to one workspace.
///
/// Test code substitutes an implementation that records every call; see
/// [`DirectorSession`] for how the primitives are sequenced.
pub trait Director {
    /// Write `contents` into the workspace as `name`, returning its path.
    fn save_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf>;

    /// Path `name` has inside the workspace.
    fn path_of(&self, name: &str) -> PathBuf;

    /// Read `name` from the workspace, `None` if absent.
    fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Run an unauthenticated CLI command, returning combined output.
    fn run_command(&self, args: &[String]) -> Result<String>;

    /// Run a CLI command against the director endpoint.
    fn run_authenticated_command(&self, args: &[String]) -> Result<String>;

    /// Release the workspace. Safe to call more than once.
    fn cleanup(&mut self) -> Result<()>;
}

/// `create-env <manifest> --state <state>`
pub fn create_env_args(manifest: &Path, state: &Path) -> Vec<String> {
    env_args("create-env", manifest, state)
}

/// `delete-env <manifest> --state <state>`
pub fn delete_env_args(manifest: &Path, state: &Path) -> Vec<String> {
    env_args("delete-env", manifest, state)
}

fn env_args(command: &str, manifest: &Path, state: &Path) -> Vec<String> {
    vec![
        command.to_string(),
        manifest.display().to_string(),
        "--state".to_string(),
        state.display().to_string(),
    ]
}

/// `update-cloud-config <path>`
pub fn update_cloud_config_args(cloud_config: &Path) -> Vec<String> {
    vec![
        "update-cloud-config".to_string(),
        cloud_config.display().to_string(),
    ]
}

/// `upload-stemcell <url>`
pub fn upload_stemcell_args(url: &str) -> Vec<String> {
    vec!["upload-stemcell".to_string(), url.to_string()]
}

/// `--deployment <name> deploy <manifest>`
pub fn deploy_args(deployment: &str, manifest: &Path) -> Vec<String> {
    vec![
        "--deployment".to_string(),
        deployment.to_string(),
        "deploy".to_string(),
        manifest.display().to_string(),
    ]
}

/// `--environment <url> --ca-cert <path> --client <user> --client-secret <password>`
pub fn auth_args(endpoint: &Endpoint, ca_cert_path: &Path) -> Vec<String> {
    vec![
        "--environment".to_string(),
        endpoint.url.clone(),
        "--ca-cert".to_string(),
        ca_cert_path.display().to_string(),
        "--client".to_string(),
        endpoint.client.clone(),
        "--client-secret".to_string(),
        endpoint.client_secret.clone(),
    ]
}

/// Whether converge output reports success.
pub fn is_converged(output: &str) -> bool {
    SUCCESS_MARKERS.iter().any(|m| output.contains(m))
}

/// Fail with [`Error::Verification`] unless converge output reports success.
pub fn verify_converged(output: &str) -> Result<()> {
    if is_converged(output) {
        Ok(())
    } else {
        Err(Error::Verification {
            markers: SUCCESS_MARKERS,
        })
    }
}
