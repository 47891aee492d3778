//! Destroy: best-effort director deletion, then infrastructure teardown.
//!
//! Only the director phase may fail without stopping the run: its errors
//! become a warning and any state it left behind is kept for the next
//! attempt. Infrastructure is destroyed either way.

use super::{ProvisionerFactory, with_provisioner};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::ConfigStore;
use directorkit::{DirectorClient, STATE_FILENAME};
use infrakit::Metadata;
use std::io::Write;

/// Printed once everything is gone.
pub const DESTROY_BANNER: &str = "\nDESTROY SUCCESSFUL\n\n";

/// Builds a prepared director client from the config, metadata and stored state.
pub type DirectorFactory<'a> =
    dyn Fn(&Config, &Metadata, &[u8]) -> Result<Box<dyn DirectorClient>> + 'a;

/// Tears down one deployment.
pub struct DestroyOrchestrator<'a> {
    store: &'a dyn ConfigStore,
    provisioner: &'a ProvisionerFactory<'a>,
    director: &'a DirectorFactory<'a>,
}

impl<'a> DestroyOrchestrator<'a> {
    pub fn new(
        store: &'a dyn ConfigStore,
        provisioner: &'a ProvisionerFactory<'a>,
        director: &'a DirectorFactory<'a>,
    ) -> Self {
        Self {
            store,
            provisioner,
            director,
        }
    }

    /// Destroy the stored deployment, writing warnings and the banner to `out`.
    pub fn destroy(&self, out: &mut dyn Write) -> Result<()> {
        let config = self.store.load()?;

        with_provisioner(self.provisioner, &config, |provisioner| {
            let metadata = provisioner.output()?;

            if let Err(e) = self.delete_director(&config, &metadata) {
                self.recover(&e, out);
            }

            provisioner.destroy()?;
            self.store.delete_all(&config)
        })?;

        out.write_all(DESTROY_BANNER.as_bytes())
            .map_err(|e| Error::persistence("writing output", e))
    }

    fn delete_director(&self, config: &Config, metadata: &Metadata) -> Result<()> {
        let Some(state) = self.store.load_asset(STATE_FILENAME)? else {
            log::info!("No director state stored, skipping director deletion");
            return Ok(());
        };

        let mut client = (self.director)(config, metadata, state.as_slice())?;
        let result = client.delete_director();
        if let Err(e) = client.cleanup() {
            log::warn!("Failed to clean up director workspace: {e}");
        }
        result?;

        self.store.delete_asset(STATE_FILENAME)
    }

    /// Report a director failure and keep whatever state it left.
    fn recover(&self, err: &Error, out: &mut dyn Write) {
        if err.kind().is_recoverable() {
            log::warn!("Director deletion failed: {err}");
        } else {
            log::warn!("Could not start director deletion: {err}");
        }
        if let Err(e) = write!(
            out,
            "Warning error deleting director: \n{err}\n\nContinuing with infrastructure destroy\n"
        ) {
            log::warn!("Could not write director deletion warning: {e}");
        }

        if let Some(partial) = err.partial_state()
            && let Err(e) = self.store.store_asset(STATE_FILENAME, partial)
        {
            log::warn!("Could not save director state left by failed deletion: {e}");
        }
    }
}
