//! Orchestrator for a complete manifest generation run
//!
//! This module coordinates the phases into one call: load the tenant and
//! team configuration, assemble the manifests, merge the shared
//! aggregators with their published state and publish the result.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use super::publish::PublishOutcome;
use super::{assembly, kustomization, publish};
use crate::config::{FluxService, FluxTeamConfig, FluxTenant};
use crate::defaults::{team_config_path, tenant_config_path};
use crate::error::Result;
use crate::files::GeneratedFiles;
use crate::store::{read_config, ConfigStore, RepoRef};
use crate::templates::TemplateStore;

/// One generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub tenant: String,
    pub team: String,
    /// Restrict generation to one service of the team
    pub service: Option<String>,
    /// Assemble and merge, but do not publish
    pub dry_run: bool,
}

impl GenerationRequest {
    pub fn new(tenant: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            team: team.into(),
            service: None,
            dry_run: false,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Outcome of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// False when the team or tenant configuration is missing
    pub config_exists: bool,
    /// User-facing problems that did not abort the run
    pub errors: Vec<String>,
    pub outcome: PublishOutcome,
    /// Every generated path, sorted
    pub paths: Vec<String>,
}

impl GenerationResult {
    fn aborted(config_exists: bool, error: String) -> Self {
        Self {
            config_exists,
            errors: vec![error],
            outcome: PublishOutcome::NotAttempted,
            paths: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.config_exists && self.errors.is_empty()
    }
}

/// Runs generation against a configuration, template and manifests
/// repository, all reached through one store.
pub struct ManifestGenerator {
    store: Arc<dyn ConfigStore>,
    templates: TemplateStore,
    config_repo: RepoRef,
    services_repo: RepoRef,
}

impl ManifestGenerator {
    /// `config_repo` and `services_repo` point at the default branches of
    /// the configuration and manifests repositories.
    pub fn new(
        store: Arc<dyn ConfigStore>,
        templates: TemplateStore,
        config_repo: RepoRef,
        services_repo: RepoRef,
    ) -> Self {
        Self {
            store,
            templates,
            config_repo,
            services_repo,
        }
    }

    fn load_configs(&self, request: &GenerationRequest) -> Result<Option<(FluxTenant, FluxTeamConfig)>> {
        let store = self.store.as_ref();
        let tenant: Option<FluxTenant> =
            read_config(store, &self.config_repo, &tenant_config_path(&request.tenant))?;
        let team: Option<FluxTeamConfig> =
            read_config(store, &self.config_repo, &team_config_path(&request.team))?;
        Ok(tenant.zip(team))
    }

    /// Assemble and merge the manifests for `request` without publishing.
    pub fn assemble(
        &self,
        tenant: &FluxTenant,
        team: &FluxTeamConfig,
        services: &[&FluxService],
    ) -> Result<GeneratedFiles> {
        let templates = self.templates.get_templates()?;
        let mut files = assembly::execute(team, tenant, &templates, services)?;
        kustomization::execute(
            self.store.as_ref(),
            &self.services_repo,
            team,
            tenant,
            services,
            &mut files,
        )?;
        Ok(files)
    }

    /// Execute the complete generation run.
    ///
    /// Missing configuration and an unknown service are reported in the
    /// result and nothing is written. Template and Git failures are errors.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let Some((tenant, team)) = self.load_configs(request)? else {
            warn!(
                "Configuration missing for team {} in tenant {}",
                request.team, request.tenant
            );
            return Ok(GenerationResult::aborted(
                false,
                format!(
                    "Flux configuration not found for team '{}' and tenant '{}'",
                    request.team, request.tenant
                ),
            ));
        };

        let services: Vec<&FluxService> = match &request.service {
            Some(name) => match team.service(name) {
                Some(service) => vec![service],
                None => {
                    return Ok(GenerationResult::aborted(
                        true,
                        format!("Service '{}' not found in team '{}'", name, team.team_name),
                    ))
                }
            },
            None => team.services.iter().collect(),
        };

        let files = self.assemble(&tenant, &team, &services)?;
        let paths: Vec<String> = files.paths().into_iter().map(String::from).collect();
        info!("Generated {} manifests for {}", paths.len(), team.team_name);

        let mut errors = Vec::new();
        let outcome = if request.dry_run {
            PublishOutcome::NotAttempted
        } else {
            let service = request.service.as_deref();
            publish::execute(
                self.store.as_ref(),
                &self.services_repo,
                &publish::feature_branch(&team.team_name, service),
                &publish::pull_request_title(&team.team_name, service),
                &files,
                &mut errors,
            )?
        };

        Ok(GenerationResult {
            config_exists: true,
            errors,
            outcome,
            paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TEAM: &str = r#"
serviceCode: FFC
programmeName: ffc
teamName: ffc-demo
services:
  - name: ffc-demo-web
    type: Frontend
    environments:
      - name: snd1
"#;

    fn generator(store: Arc<MemoryStore>) -> ManifestGenerator {
        let config = RepoRef::new("config", "main");
        let templates = TemplateStore::new(store.clone(), config.clone());
        ManifestGenerator::new(store, templates, config, RepoRef::new("services", "main"))
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                &RepoRef::new("config", "main"),
                vec![
                    ("flux/snd-config.yaml", "environments:\n  - name: snd1\n"),
                    ("flux/services/ffc-demo.yaml", TEAM),
                    (
                        "flux/templates/programme/team/service/kustomization.yaml",
                        "resources:\n  - deploy-kustomize.yaml\n",
                    ),
                    (
                        "flux/templates/programme/team/environment/kustomization.yaml",
                        "resources: []\n",
                    ),
                ],
            )
            .unwrap();
        store
            .seed(&RepoRef::new("services", "main"), vec![("README.md", "manifests")])
            .unwrap();
        store
    }

    #[test]
    fn test_missing_team_config() {
        let store = seeded();
        let result = generator(store.clone())
            .generate(&GenerationRequest::new("snd", "unknown-team"))
            .unwrap();
        assert!(!result.config_exists);
        assert_eq!(result.outcome, PublishOutcome::NotAttempted);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_missing_tenant_config() {
        let store = seeded();
        let result = generator(store.clone())
            .generate(&GenerationRequest::new("prd", "ffc-demo"))
            .unwrap();
        assert!(!result.config_exists);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_unknown_service_filter() {
        let store = seeded();
        let result = generator(store.clone())
            .generate(&GenerationRequest::new("snd", "ffc-demo").with_service("nope"))
            .unwrap();
        assert!(result.config_exists);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("nope"));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_dry_run_does_not_publish() {
        let store = seeded();
        let result = generator(store.clone())
            .generate(&GenerationRequest::new("snd", "ffc-demo").dry_run())
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.outcome, PublishOutcome::NotAttempted);
        assert_eq!(
            result.paths,
            vec![
                "services/ffc/ffc-demo/ffc-demo-web/kustomization.yaml",
                "services/ffc/ffc-demo/snd/01/kustomization.yaml",
            ]
        );
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_generate_publishes_service_branch() {
        let store = seeded();
        let result = generator(store.clone())
            .generate(&GenerationRequest::new("snd", "ffc-demo").with_service("ffc-demo-web"))
            .unwrap();
        assert!(result.is_success());
        assert!(matches!(
            result.outcome,
            PublishOutcome::PullRequestCreated { ref branch, .. } if branch == "features/ffc-demo-ffc-demo-web"
        ));
    }
}
