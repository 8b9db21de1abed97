//! Init-team command implementation
//!
//! Writes a new team configuration file to the configuration repository.
//! Fails when the team already has one.

use anyhow::Result;
use clap::Args;
use flux_onboarding::config::{FluxConfig, FluxTeamConfig};
use flux_onboarding::output::{emoji, OutputConfig};
use flux_onboarding::store::ConfigStore;
use flux_onboarding::teams::TeamConfigService;

use crate::cli::Settings;

/// Arguments for the init-team command
#[derive(Args, Debug)]
pub struct InitTeamArgs {
    /// Name of the new team
    #[arg(long, value_name = "TEAM")]
    pub team: String,

    /// Programme the team belongs to
    #[arg(long, value_name = "PROGRAMME")]
    pub programme: String,

    /// Short service code of the team (e.g. FFC)
    #[arg(long, value_name = "CODE")]
    pub service_code: String,

    /// Team-level config variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<FluxConfig>,
}

impl InitTeamArgs {
    fn config(&self) -> FluxTeamConfig {
        FluxTeamConfig {
            service_code: self.service_code.clone(),
            programme_name: self.programme.clone(),
            team_name: self.team.clone(),
            services: Vec::new(),
            config_variables: self.variables.clone(),
        }
    }
}

/// Create the team configuration in `store`.
pub fn run(store: &dyn ConfigStore, settings: &Settings, args: &InitTeamArgs) -> Result<()> {
    let repo = settings.config_repo();
    TeamConfigService::new(store, &repo).create_team(&args.config())?;
    Ok(())
}

/// Execute the init-team command
pub fn execute(args: InitTeamArgs, settings: &Settings, output: &OutputConfig) -> Result<()> {
    let store = super::open_store(settings);
    run(store.as_ref(), settings, &args)?;
    println!(
        "{} Created Flux configuration for {}",
        emoji(output, "✅", "[OK]"),
        output.highlight(&args.team)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use flux_onboarding::store::MemoryStore;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
        #[command(flatten)]
        args: InitTeamArgs,
    }

    #[test]
    fn test_init_team_parses_variables() {
        let harness = Harness::parse_from([
            "flux-onboarding",
            "--team",
            "ffc-demo",
            "--programme",
            "ffc",
            "--service-code",
            "FFC",
            "--var",
            "TEAM_CONTACT=ffc@example.com",
        ]);
        let config = harness.args.config();
        assert_eq!(config.team_name, "ffc-demo");
        assert_eq!(config.config_variables[0].key, "TEAM_CONTACT");
    }

    #[test]
    fn test_init_team_rejects_existing_team() {
        let harness = Harness::parse_from([
            "flux-onboarding",
            "--team",
            "ffc-demo",
            "--programme",
            "ffc",
            "--service-code",
            "FFC",
        ]);
        let store = MemoryStore::new();
        store
            .seed(&harness.settings.config_repo(), Vec::<(String, String)>::new())
            .unwrap();
        run(&store, &harness.settings, &harness.args).unwrap();
        let err = run(&store, &harness.settings, &harness.args).unwrap_err();
        assert!(err.to_string().contains("already has a Flux configuration"));
    }
}
