use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackup")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision infrastructure, a director and an application on top", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (also streams tool output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision infrastructure, converge the director and deploy the application
    Deploy(DeployArgs),

    /// Delete the director and destroy all infrastructure
    Destroy(DestroyArgs),

    /// Show what is deployed for a project
    Info(ProjectArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ProjectArgs {
    /// Project name
    #[arg(short, long, env = "STACKUP_PROJECT")]
    pub project: String,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Config file (TOML); replaces the stored config
    #[arg(short, long, required_unless_present = "project")]
    pub config: Option<PathBuf>,

    /// Redeploy a project using its stored config
    #[arg(short, long, conflicts_with = "config")]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: ProjectArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_needs_config_or_project() {
        assert!(Cli::try_parse_from(["stackup", "deploy", "--config", "a.toml"]).is_ok());
        assert!(Cli::try_parse_from(["stackup", "deploy", "-p", "happymeal"]).is_ok());
        assert!(
            Cli::try_parse_from(["stackup", "deploy", "-c", "a.toml", "-p", "happymeal"]).is_err()
        );
    }

    #[test]
    fn test_destroy_flags() {
        let cli = Cli::try_parse_from(["stackup", "-vv", "destroy", "-p", "happymeal", "--yes"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Destroy(args) => {
                assert_eq!(args.target.project, "happymeal");
                assert!(args.yes);
            }
            _ => panic!("expected destroy"),
        }
    }
}
