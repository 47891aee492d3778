//! Provisioner backed by the `terraform` CLI.
//!
//! The client renders a small root module as `main.tf.json` into its own
//! workspace. That module wires a local state backend, the cloud provider and
//! the infrastructure module, and re-exports every output in
//! [`OUTPUT_NAMES`](crate::metadata::OUTPUT_NAMES) so it can be read back.

use crate::Provisioner;
use crate::error::Result;
use crate::metadata::{Metadata, OUTPUT_NAMES};
use execkit::{Invocation, ProcessRunner, Workspace};
use serde_json::{Map, Value, json};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Environment variable overriding the terraform binary location.
pub const ENV_BIN: &str = "STACKUP_TERRAFORM_BIN";

/// Name of the rendered root module.
pub const CONFIG_FILENAME: &str = "main.tf.json";

/// Locate terraform (`STACKUP_TERRAFORM_BIN`, then `terraform` on PATH).
pub fn find_cli() -> Result<PathBuf> {
    Ok(execkit::find_binary("terraform", ENV_BIN)?)
}

/// Inputs for rendering the root module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformConfig {
    /// Source of the infrastructure module (path or registry address)
    pub module_source: String,
    /// Where terraform keeps state between runs
    pub state_path: PathBuf,
    /// Cloud region
    pub region: String,
    /// Variables passed to the infrastructure module
    pub variables: BTreeMap<String, String>,
}

impl TerraformConfig {
    /// Render `main.tf.json`.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut module = Map::new();
        module.insert("source".into(), Value::String(self.module_source.clone()));
        for (key, value) in &self.variables {
            module.insert(key.clone(), Value::String(value.clone()));
        }

        let outputs: Map<String, Value> = OUTPUT_NAMES
            .iter()
            .map(|name| {
                (
                    (*name).to_string(),
                    json!({ "value": format!("${{module.infra.{name}}}"), "sensitive": true }),
                )
            })
            .collect();

        let root = json!({
            "terraform": {
                "backend": { "local": { "path": self.state_path.display().to_string() } }
            },
            "provider": { "aws": { "region": self.region } },
            "module": { "infra": module },
            "output": outputs,
        });

        Ok(serde_json::to_vec_pretty(&root)?)
    }
}

/// Terraform-backed [`Provisioner`].
pub struct TerraformClient<R: ProcessRunner> {
    binary: PathBuf,
    runner: R,
    workspace: Option<Workspace>,
    initialized: Cell<bool>,
}

impl<R: ProcessRunner> TerraformClient<R> {
    /// Render `config` into `workspace` and return a client over it.
    pub fn new(
        binary: impl Into<PathBuf>,
        runner: R,
        workspace: Workspace,
        config: &TerraformConfig,
    ) -> Result<Self> {
        workspace.write_file(CONFIG_FILENAME, &config.render()?)?;
        Ok(Self {
            binary: binary.into(),
            runner,
            workspace: Some(workspace),
            initialized: Cell::new(false),
        })
    }

    fn invocation(&self, args: &[&str]) -> Result<Invocation> {
        let workspace = self.workspace.as_ref().ok_or_else(|| {
            execkit::Error::workspace(
                PathBuf::from(CONFIG_FILENAME),
                std::io::Error::new(std::io::ErrorKind::NotFound, "workspace released"),
            )
        })?;
        Ok(Invocation::new(&self.binary)
            .args(args)
            .current_dir(workspace.path())
            .env("TF_IN_AUTOMATION", "1"))
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        self.init()?;
        let output = self.runner.run(&self.invocation(args)?)?;
        Ok(output.stdout_str())
    }

    fn init(&self) -> Result<()> {
        if self.initialized.get() {
            return Ok(());
        }
        log::debug!("Initializing terraform");
        self.runner
            .run(&self.invocation(&["init", "-input=false", "-no-color"])?)?;
        self.initialized.set(true);
        Ok(())
    }
}

impl<R: ProcessRunner> Provisioner for TerraformClient<R> {
    fn apply(&self) -> Result<()> {
        log::info!("Applying infrastructure");
        self.run(&["apply", "-input=false", "-auto-approve", "-no-color"])?;
        Ok(())
    }

    fn output(&self) -> Result<Metadata> {
        let json = self.run(&["output", "-json", "-no-color"])?;
        Metadata::from_output_json(&json)
    }

    fn destroy(&self) -> Result<()> {
        log::info!("Destroying infrastructure");
        self.run(&["destroy", "-input=false", "-auto-approve", "-no-color"])?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(workspace) = self.workspace.take() {
            workspace.cleanup()?;
        }
        Ok(())
    }
}
