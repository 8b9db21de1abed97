//! Add-environment command implementation

use anyhow::Result;
use clap::Args;
use flux_onboarding::config::{FluxConfig, FluxEnvironment};
use flux_onboarding::output::{emoji, OutputConfig};
use flux_onboarding::teams::TeamConfigService;

use crate::cli::Settings;

/// Arguments for the add-environment command
#[derive(Args, Debug)]
pub struct AddEnvironmentArgs {
    /// Team that owns the service
    #[arg(long, value_name = "TEAM")]
    pub team: String,

    /// Service to add the environment to
    #[arg(long, value_name = "SERVICE")]
    pub service: String,

    /// Environment name, e.g. snd1
    #[arg(long = "env", value_name = "ENV")]
    pub environment: String,

    /// Environment config variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<FluxConfig>,
}

/// Execute the add-environment command
pub fn execute(args: AddEnvironmentArgs, settings: &Settings, output: &OutputConfig) -> Result<()> {
    let store = super::open_store(settings);
    let repo = settings.config_repo();
    let mut environment = FluxEnvironment::new(&args.environment);
    environment.config_variables = args.variables.clone();

    TeamConfigService::new(store.as_ref(), &repo).add_environment(
        &args.team,
        &args.service,
        environment,
    )?;
    println!(
        "{} Added environment {} to {}",
        emoji(output, "✅", "[OK]"),
        output.highlight(&args.environment),
        args.service
    );
    Ok(())
}
