//! Deploy: converge the director, configure it and deploy the application.

use super::{ProvisionerFactory, with_provisioner};
use crate::config::Config;
use crate::db::{DbRunner, create_database_sql, is_already_exists};
use crate::error::Result;
use crate::manifest;
use crate::store::ConfigStore;
use directorkit::{Director, DirectorClient, DirectorSession, STATE_FILENAME};
use infrakit::Metadata;

/// Runs one deploy against one director.
///
/// The session's workspace is released when [`deploy`](Self::deploy)
/// returns, whatever the outcome.
pub struct DeployOrchestrator<'a, D: Director> {
    config: &'a Config,
    metadata: &'a Metadata,
    session: DirectorSession<D>,
    db: &'a dyn DbRunner,
}

impl<'a, D: Director> DeployOrchestrator<'a, D> {
    pub fn new(config: &'a Config, metadata: &'a Metadata, director: D, db: &'a dyn DbRunner) -> Self {
        Self {
            config,
            metadata,
            session: DirectorSession::new(director),
            db,
        }
    }

    /// Deploy everything, returning the director state after converge.
    ///
    /// `prior_state` is `None` when no director has been created yet. The new
    /// state is handed to `sink` as soon as converge finishes, and also when
    /// converge fails after leaving a state file, so no failure loses it.
    pub fn deploy(
        mut self,
        prior_state: Option<&[u8]>,
        sink: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<Vec<u8>> {
        let result = self.run(prior_state, sink);
        if let Err(e) = &result {
            log::debug!("Deploy failed in phase {}: {e}", self.session.phase());
            self.session.fail();
        }
        if let Err(e) = self.session.cleanup() {
            log::warn!("Failed to clean up director workspace: {e}");
        }
        result
    }

    fn run(
        &mut self,
        prior_state: Option<&[u8]>,
        sink: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<Vec<u8>> {
        let artifacts = manifest::artifacts(self.config, self.metadata)?;
        self.session.prepare(artifacts, prior_state)?;

        let state = match self.session.converge() {
            Ok(state) => state,
            Err(e) => {
                if let Some(partial) = e.partial_state()
                    && let Err(sink_err) = sink(partial)
                {
                    log::warn!("Could not save director state left by failed converge: {sink_err}");
                }
                return Err(e.into());
            }
        };
        sink(&state)?;

        self.session.update_cloud_config()?;
        if let Some(url) = &self.config.stemcell_url {
            self.session.upload_stemcell(url)?;
        }

        self.create_database()?;

        let app_manifest = manifest::app_manifest(self.config, self.metadata)?;
        self.session
            .deploy_application(&self.config.app_deployment, &app_manifest)?;
        self.session.complete()?;
        Ok(state)
    }

    fn create_database(&self) -> Result<()> {
        let sql = create_database_sql(&self.config.db_name);
        log::info!("Creating database {}", self.config.db_name);
        match self.db.run(&sql) {
            Ok(()) => Ok(()),
            // A rerun after a failure past this step finds the database in place
            Err(e) if is_already_exists(&e) => {
                log::warn!("Database {} already exists, continuing", self.config.db_name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// What a successful deploy produced.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub config: Config,
    pub metadata: Metadata,
}

/// Full deploy: settle the config, converge infrastructure, then deploy.
///
/// With `config` given it replaces whatever is stored, keeping the stored
/// creation time; otherwise the stored config is used. The director state asset is written the moment converge
/// produces it.
pub fn deploy_stack<D: Director>(
    store: &dyn ConfigStore,
    config: Option<Config>,
    provisioner: &ProvisionerFactory<'_>,
    director: impl FnOnce(&Config, &Metadata) -> Result<D>,
    db: impl FnOnce(&Config, &Metadata) -> Result<Box<dyn DbRunner>>,
) -> Result<Deployment> {
    let config = match config {
        Some(mut config) => {
            if store.exists()? {
                match store.load() {
                    Ok(stored) => config.created_at = stored.created_at,
                    Err(e) => log::warn!("Stored config is unreadable, replacing it: {e}"),
                }
            }
            store.store(&config)?;
            config
        }
        None => store.load()?,
    };

    let metadata = with_provisioner(provisioner, &config, |p| {
        p.apply()?;
        Ok(p.output()?)
    })?;

    let prior_state = store.load_asset(STATE_FILENAME)?;
    if prior_state.is_none() {
        log::info!("No director state stored, creating a new director");
    }

    let director = director(&config, &metadata)?;
    let db = db(&config, &metadata)?;
    let mut sink = |state: &[u8]| store.store_asset(STATE_FILENAME, state);
    DeployOrchestrator::new(&config, &metadata, director, db.as_ref())
        .deploy(prior_state.as_deref(), &mut sink)?;

    Ok(Deployment { config, metadata })
}
