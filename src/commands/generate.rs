//! Generate command implementation
//!
//! Runs the manifest engine for one team (optionally one service):
//! 1. Load the tenant and team configuration
//! 2. Assemble manifests from the cached templates
//! 3. Merge the shared aggregator kustomizations
//! 4. Publish the changed files through a feature branch and pull request

use anyhow::Result;
use clap::Args;
use flux_onboarding::output::{describe_result, emoji, OutputConfig};
use flux_onboarding::phases::{GenerationRequest, GenerationResult, ManifestGenerator};
use flux_onboarding::store::ConfigStore;
use flux_onboarding::templates::TemplateStore;
use std::sync::Arc;

use crate::cli::Settings;

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Tenant whose environments are generated (e.g. snd)
    #[arg(long, value_name = "TENANT", env = "FLUX_ONBOARDING_TENANT")]
    pub tenant: String,

    /// Team to generate manifests for
    #[arg(long, value_name = "TEAM")]
    pub team: String,

    /// Only generate this service of the team
    #[arg(long, value_name = "SERVICE")]
    pub service: Option<String>,

    /// Assemble and merge, list the files, but publish nothing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    fn request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(&self.tenant, &self.team);
        request.service = self.service.clone();
        request.dry_run = self.dry_run;
        request
    }
}

/// Run a request against `store`.
pub fn run(store: Arc<dyn ConfigStore>, settings: &Settings, request: &GenerationRequest) -> Result<GenerationResult> {
    let templates = TemplateStore::process_wide(store.clone(), settings.templates_repo());
    let generator = ManifestGenerator::new(
        store,
        templates,
        settings.config_repo(),
        settings.services_repo(),
    );
    Ok(generator.generate(request)?)
}

/// Execute the generate command
pub fn execute(args: GenerateArgs, settings: &Settings, output: &OutputConfig) -> Result<()> {
    let request = args.request();
    if !args.json {
        println!(
            "{} Generating manifests for {}",
            emoji(output, "🔍", "[GENERATE]"),
            output.highlight(&request.team)
        );
        if request.dry_run {
            println!("{} DRY RUN MODE - nothing will be published", emoji(output, "🔎", "[DRY RUN]"));
        }
    }

    let result = run(super::open_store(settings), settings, &request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if request.dry_run {
            for path in &result.paths {
                println!("   {}", path);
            }
        }
        for line in describe_result(output, &result) {
            println!("{}", line);
        }
    }

    if !result.config_exists {
        anyhow::bail!("Flux configuration not found for team '{}'", request.team);
    }
    if !result.errors.is_empty() {
        anyhow::bail!("Generation finished with {} error(s)", result.errors.len());
    }
    Ok(())
}
