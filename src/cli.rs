//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use flux_onboarding::defaults::DEFAULT_BRANCH;
use flux_onboarding::output::OutputConfig;
use flux_onboarding::store::RepoRef;

use crate::commands;

/// Flux Onboarding - Generate and publish Flux manifests for teams
#[derive(Parser, Debug)]
#[command(name = "flux-onboarding")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Where the repositories live, shared by every command
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Directory holding one local clone per repository
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "FLUX_ONBOARDING_REPOS_ROOT",
        default_value = "."
    )]
    pub repos_root: PathBuf,

    /// Repository holding team and tenant configuration
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "FLUX_ONBOARDING_CONFIG_REPO",
        default_value = "adp-flux-core"
    )]
    pub config_repo: String,

    /// Repository holding the manifest templates
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "FLUX_ONBOARDING_TEMPLATES_REPO",
        default_value = "adp-flux-core"
    )]
    pub templates_repo: String,

    /// Repository generated manifests are published to
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "FLUX_ONBOARDING_SERVICES_REPO",
        default_value = "adp-flux-services"
    )]
    pub services_repo: String,

    /// Default branch of every repository
    #[arg(
        long,
        global = true,
        value_name = "BRANCH",
        env = "FLUX_ONBOARDING_DEFAULT_BRANCH",
        default_value = DEFAULT_BRANCH
    )]
    pub default_branch: String,
}

impl Settings {
    pub fn config_repo(&self) -> RepoRef {
        RepoRef::new(&self.config_repo, &self.default_branch)
    }

    pub fn templates_repo(&self) -> RepoRef {
        RepoRef::new(&self.templates_repo, &self.default_branch)
    }

    pub fn services_repo(&self) -> RepoRef {
        RepoRef::new(&self.services_repo, &self.default_branch)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a team's manifests and publish them through a pull request
    Generate(commands::generate::GenerateArgs),

    /// Create the Flux configuration of a new team
    InitTeam(commands::init_team::InitTeamArgs),

    /// Add a service to a team
    AddService(commands::add_service::AddServiceArgs),

    /// Add an environment to a service
    AddEnvironment(commands::add_environment::AddEnvironmentArgs),

    /// Set the manifest flags of a service environment
    Manifest(commands::manifest::ManifestArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Generate(args) => commands::generate::execute(args, &self.settings, &output),
            Commands::InitTeam(args) => commands::init_team::execute(args, &self.settings, &output),
            Commands::AddService(args) => commands::add_service::execute(args, &self.settings, &output),
            Commands::AddEnvironment(args) => {
                commands::add_environment::execute(args, &self.settings, &output)
            }
            Commands::Manifest(args) => commands::manifest::execute(args, &self.settings, &output),
        }
    }
}

/// Initialise `env_logger` at `level`; `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
