use anyhow::{Context as _, Result};

use super::{Infra, open_store};
use crate::Context;
use crate::cli::ProjectArgs;
use crate::config::Config;
use crate::engine::with_provisioner;
use crate::store::ConfigStore;
use crate::ui;
use directorkit::STATE_FILENAME;

pub fn run(ctx: &Context, args: ProjectArgs) -> Result<()> {
    let store = open_store(&args.project)?;
    let config = store
        .load()
        .with_context(|| format!("Could not load config for '{}'", args.project))?;

    let infra = Infra::new(ctx, &store)?;
    let metadata = with_provisioner(
        &|config: &Config| infra.provisioner(config),
        &config,
        |provisioner| Ok(provisioner.output()?),
    )
    .context("Could not read infrastructure outputs")?;
    let has_director = store.load_asset(STATE_FILENAME)?.is_some();

    ui::header(&format!("Project {}", config.project));
    ui::kv("Deployment", &config.deployment);
    ui::kv("Region", &config.region);
    ui::kv("Created", &config.created_at.format("%Y-%m-%d %H:%M UTC").to_string());
    ui::kv("Director", &metadata.director_url());
    ui::kv("Director state", if has_director { "stored" } else { "none" });
    ui::kv(
        "Database",
        &format!("{}:{}", metadata.bosh_db_address, metadata.bosh_db_port),
    );
    ui::kv("Application", &config.app_deployment);
    if let Some(url) = &config.stemcell_url {
        ui::kv("Stemcell", url);
    }
    Ok(())
}
