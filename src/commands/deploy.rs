use anyhow::{Context as _, Result};

use super::{Infra, database, director, open_store, runner};
use crate::Context;
use crate::cli::DeployArgs;
use crate::config::Config;
use crate::engine::{self, Deployment};
use crate::{progress, ui};

pub fn run(ctx: &Context, args: DeployArgs) -> Result<()> {
    let (config, project) = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("Could not load config from {}", path.display()))?;
            let project = config.project.clone();
            (Some(config), project)
        }
        None => {
            let project = args
                .project
                .clone()
                .context("--project or --config is required")?;
            if !ctx.quiet {
                ui::info(&format!("Using the stored config for {project}"));
            }
            (None, project)
        }
    };

    let store = open_store(&project)?;
    let infra = Infra::new(ctx, &store)?;
    let runner = runner(ctx);

    if !ctx.quiet {
        ui::header(&format!("Deploying {project}"));
    }
    let pb = progress::spinner(
        "Provisioning infrastructure and converging the director...",
        !ctx.quiet && ctx.verbose == 0,
    );

    let result = engine::deploy_stack(
        &store,
        config,
        &|config: &Config| infra.provisioner(config),
        |config, metadata| director(runner, config, metadata),
        |config, metadata| database(runner, config, metadata),
    );

    let Deployment {
        config, metadata, ..
    } = match result {
        Ok(deployment) => {
            progress::finish_success(&pb, "Deploy finished");
            deployment
        }
        Err(e) => {
            progress::finish_error(&pb, "Deploy failed");
            return Err(anyhow::Error::new(e).context(format!("Deploy of {project} failed")));
        }
    };

    if !ctx.quiet {
        println!();
        ui::success("DEPLOY SUCCESSFUL");
        ui::kv("Director", &metadata.director_url());
        ui::kv("Deployment", &config.app_deployment);
        ui::kv("Load balancer", &metadata.elb_name);
    }
    Ok(())
}
