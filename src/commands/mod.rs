//! Command implementations and the real collaborators they wire in.

pub mod deploy;
pub mod destroy;
pub mod info;

use crate::Context;
use crate::config::Config;
use crate::db::{self, Connection, DbRunner, PsqlRunner};
use crate::error::Result;
use crate::paths;
use crate::store::FileStore;
use directorkit::cli::CliDirector;
use directorkit::Endpoint;
use execkit::{SystemRunner, Workspace};
use infrakit::terraform::{self, TerraformClient, TerraformConfig};
use infrakit::{Metadata, Provisioner};
use std::collections::BTreeMap;

/// Store for `project` under the resolved state directory.
pub(crate) fn open_store(project: &str) -> anyhow::Result<FileStore> {
    let root = paths::state_dir()?;
    log::debug!("State directory: {}", root.display());
    Ok(FileStore::new(root, project))
}

/// Stream tool output when verbose, capture it silently otherwise.
pub(crate) fn runner(ctx: &Context) -> SystemRunner {
    if ctx.verbose > 0 && !ctx.quiet {
        SystemRunner::echoing()
    } else {
        SystemRunner::new()
    }
}

/// Everything needed to build terraform clients for one project.
pub(crate) struct Infra {
    runner: SystemRunner,
    default_module_source: String,
    state_path: std::path::PathBuf,
}

impl Infra {
    pub(crate) fn new(ctx: &Context, store: &FileStore) -> anyhow::Result<Self> {
        Ok(Self {
            runner: runner(ctx),
            default_module_source: paths::default_module_source()?.display().to_string(),
            state_path: store.terraform_state_path(),
        })
    }

    pub(crate) fn provisioner(&self, config: &Config) -> Result<Box<dyn Provisioner>> {
        let mut variables = BTreeMap::new();
        variables.insert("project".to_string(), config.project.clone());
        variables.insert("deployment".to_string(), config.deployment.clone());
        variables.insert("region".to_string(), config.region.clone());
        variables.insert("public_key".to_string(), config.public_key.clone());
        variables.insert("db_username".to_string(), config.db_username.clone());
        variables.insert("db_password".to_string(), config.db_password.clone());

        let tf_config = TerraformConfig {
            module_source: config
                .terraform_source
                .clone()
                .unwrap_or_else(|| self.default_module_source.clone()),
            state_path: self.state_path.clone(),
            region: config.region.clone(),
            variables,
        };

        let workspace = Workspace::new("stackup-terraform").map_err(infrakit::Error::from)?;
        log::debug!("Terraform workspace: {}", workspace.path().display());
        let client = TerraformClient::new(terraform::find_cli()?, self.runner, workspace, &tf_config)?;
        Ok(Box::new(client))
    }
}

/// Director CLI with its own workspace, authenticated against the deployed director.
pub(crate) fn director(
    runner: SystemRunner,
    config: &Config,
    metadata: &Metadata,
) -> Result<CliDirector<SystemRunner>> {
    let binary = directorkit::cli::find_cli()?;
    let workspace = Workspace::new("stackup-director").map_err(directorkit::Error::from)?;
    log::debug!("Director workspace: {}", workspace.path().display());

    let endpoint = Endpoint {
        url: metadata.director_url(),
        ca_cert: config.director_ca_cert.clone(),
        client: config.director_username.clone(),
        client_secret: config.director_password.clone(),
    };
    Ok(CliDirector::new(binary, runner, workspace).with_endpoint(endpoint)?)
}

/// psql runner against the deployment's database server.
pub(crate) fn database(
    runner: SystemRunner,
    config: &Config,
    metadata: &Metadata,
) -> Result<Box<dyn DbRunner>> {
    let connection = Connection {
        host: metadata.bosh_db_address.clone(),
        port: metadata.bosh_db_port.clone(),
        username: config.db_username.clone(),
        password: config.db_password.clone(),
    };
    Ok(Box::new(PsqlRunner::new(db::find_cli()?, runner, connection)))
}
