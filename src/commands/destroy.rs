use anyhow::{Context as _, Result};
use std::io;

use super::{Infra, director, open_store, runner};
use crate::Context;
use crate::cli::DestroyArgs;
use crate::config::Config;
use crate::engine::DestroyOrchestrator;
use crate::error;
use crate::manifest;
use crate::store::ConfigStore;
use crate::ui;
use directorkit::{DirectorClient, DirectorSession};
use infrakit::Metadata;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let project = args.target.project;
    let store = open_store(&project)?;

    if !store.exists()? {
        anyhow::bail!("Nothing is deployed for project '{project}'");
    }

    if !args.yes {
        let prompt = format!("Destroy the director and all infrastructure for '{project}'?");
        if !ui::confirm(&prompt)? {
            ui::warn("Aborted, nothing was destroyed");
            return Ok(());
        }
    }

    let infra = Infra::new(ctx, &store)?;
    let runner = runner(ctx);
    let director_client = |config: &Config,
                           metadata: &Metadata,
                           state: &[u8]|
     -> error::Result<Box<dyn DirectorClient>> {
        let mut session = DirectorSession::new(director(runner, config, metadata)?);
        session.prepare(manifest::artifacts(config, metadata)?, Some(state))?;
        Ok(Box::new(session))
    };

    if !ctx.quiet {
        ui::header(&format!("Destroying {project}"));
    }
    DestroyOrchestrator::new(
        &store,
        &|config: &Config| infra.provisioner(config),
        &director_client,
    )
    .destroy(&mut io::stdout())
    .with_context(|| format!("Destroy of {project} failed"))
}
