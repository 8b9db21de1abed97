//! Add-service command implementation

use anyhow::Result;
use clap::Args;
use flux_onboarding::config::{FluxConfig, FluxEnvironment, FluxService, FluxServiceType};
use flux_onboarding::output::{emoji, OutputConfig};
use flux_onboarding::store::ConfigStore;
use flux_onboarding::teams::TeamConfigService;

use crate::cli::Settings;

/// Arguments for the add-service command
#[derive(Args, Debug)]
pub struct AddServiceArgs {
    /// Team that owns the service
    #[arg(long, value_name = "TEAM")]
    pub team: String,

    /// Name of the service
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Service type (Frontend, Backend, HelmOnly)
    #[arg(long = "type", value_name = "TYPE")]
    pub service_type: FluxServiceType,

    /// Environment to deploy to, repeatable
    #[arg(long = "env", value_name = "ENV")]
    pub environments: Vec<String>,

    /// Service config variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<FluxConfig>,
}

impl AddServiceArgs {
    fn service(&self) -> FluxService {
        let mut service = FluxService::new(&self.name, self.service_type);
        service.environments = self.environments.iter().map(FluxEnvironment::new).collect();
        service.config_variables = self.variables.clone();
        service
    }
}

/// Add the service to the team configuration in `store`.
pub fn run(store: &dyn ConfigStore, settings: &Settings, args: &AddServiceArgs) -> Result<()> {
    let repo = settings.config_repo();
    TeamConfigService::new(store, &repo).add_service(&args.team, args.service())?;
    Ok(())
}

/// Execute the add-service command
pub fn execute(args: AddServiceArgs, settings: &Settings, output: &OutputConfig) -> Result<()> {
    let store = super::open_store(settings);
    run(store.as_ref(), settings, &args)?;
    println!(
        "{} Added {} service {} to {}",
        emoji(output, "✅", "[OK]"),
        args.service_type,
        output.highlight(&args.name),
        args.team
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: AddServiceArgs,
    }

    #[test]
    fn test_add_service_args() {
        let harness = Harness::parse_from([
            "flux-onboarding",
            "--team",
            "ffc-demo",
            "--name",
            "ffc-demo-claim",
            "--type",
            "backend",
            "--env",
            "snd1",
            "--env",
            "dev1",
            "--var",
            "POSTGRES_DB=ffc_demo_claim",
        ]);
        let service = harness.args.service();
        assert_eq!(service.service_type, FluxServiceType::Backend);
        assert_eq!(service.environments.len(), 2);
        assert!(service.environment("dev1").is_some());
        assert!(service.has_datastore());
    }

    #[test]
    fn test_add_service_rejects_unknown_type() {
        let result = Harness::try_parse_from([
            "flux-onboarding",
            "--team",
            "t",
            "--name",
            "s",
            "--type",
            "lambda",
        ]);
        assert!(result.is_err());
    }
}
