//! Deploy and destroy orchestration.
//!
//! The engine owns sequencing and failure policy only. Everything it talks
//! to comes in through a trait ([`Director`](directorkit::Director),
//! [`DirectorClient`](directorkit::DirectorClient),
//! [`Provisioner`](infrakit::Provisioner), [`DbRunner`](crate::db::DbRunner),
//! [`ConfigStore`](crate::store::ConfigStore)) or a factory closure, so tests
//! substitute recording fakes.

pub mod deploy;
pub mod destroy;

#[cfg(test)]
pub(crate) mod fakes;

pub use deploy::{Deployment, deploy_stack};
pub use destroy::DestroyOrchestrator;

use crate::config::Config;
use crate::error::Result;
use infrakit::Provisioner;

/// Builds the provisioner for a config.
pub type ProvisionerFactory<'a> = dyn Fn(&Config) -> Result<Box<dyn Provisioner>> + 'a;

/// Build a provisioner, run `f` with it and release its workspace whatever happens.
pub fn with_provisioner<T>(
    factory: &ProvisionerFactory<'_>,
    config: &Config,
    f: impl FnOnce(&dyn Provisioner) -> Result<T>,
) -> Result<T> {
    let mut provisioner = factory(config)?;
    let result = f(provisioner.as_ref());
    if let Err(e) = provisioner.cleanup() {
        log::warn!("Failed to clean up provisioner workspace: {e}");
    }
    result
}
