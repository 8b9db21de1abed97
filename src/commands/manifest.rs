//! Manifest command implementation
//!
//! Records whether manifests are generated for a service environment and,
//! optionally, the version they were generated at.

use anyhow::Result;
use clap::Args;
use flux_onboarding::output::{emoji, OutputConfig};
use flux_onboarding::teams::TeamConfigService;

use crate::cli::Settings;

/// Arguments for the manifest command
#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[arg(long, value_name = "TEAM")]
    pub team: String,

    #[arg(long, value_name = "SERVICE")]
    pub service: String,

    #[arg(long = "env", value_name = "ENV")]
    pub environment: String,

    /// Whether manifests are generated for this environment
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub generate: bool,

    /// Version the manifests were generated at
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

/// Execute the manifest command
pub fn execute(args: ManifestArgs, settings: &Settings, output: &OutputConfig) -> Result<()> {
    let store = super::open_store(settings);
    let repo = settings.config_repo();
    TeamConfigService::new(store.as_ref(), &repo).set_manifest(
        &args.team,
        &args.service,
        &args.environment,
        args.generate,
        args.version.as_deref(),
    )?;
    println!(
        "{} Manifest of {} in {} set to generate={}",
        emoji(output, "✅", "[OK]"),
        output.highlight(&args.service),
        args.environment,
        args.generate
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
        args: ManifestArgs,
    }

    #[test]
    fn test_generate_takes_explicit_value() {
        let harness = Harness::parse_from([
            "flux-onboarding",
            "--team",
            "ffc-demo",
            "--service",
            "ffc-demo-web",
            "--env",
            "snd1",
            "--generate",
            "false",
        ]);
        assert!(!harness.args.generate);
        assert!(harness.args.version.is_none());
    }
}
