//! Kustomization Merge
//!
//! Per-environment aggregator kustomizations are shared: one lists every
//! service of a team, the other every team of a programme. A run only knows
//! the services it onboards, so each aggregator it generates is merged with
//! the copy already published on the destination's default branch.
//!
//! ## Process
//!
//! For every service and each of its environments present in the tenant:
//!
//! 1.  **Team aggregator** `services/{programme}/{team}/{env}/kustomization.yaml`
//!     gets the reference `../../{service}`.
//!
//! 2.  **Programme aggregator** `services/{programme}/{env}/kustomization.yaml`
//!     gets the reference `../../{team}/{env}`.
//!
//! The published copy is fetched once per path per run and replaces the
//! generated content when it exists. References are appended only when
//! absent, which keeps reruns idempotent and the published order intact.
//! Aggregators this run did not generate are left alone.

use std::collections::HashSet;

use log::debug;

use crate::config::{FluxService, FluxTeamConfig, FluxTenant};
use crate::error::{Error, Result};
use crate::files::GeneratedFiles;
use crate::node;
use crate::path::{environment_path, output_path, PathContext};
use crate::phases::assembly::append_resource;
use crate::store::{ConfigStore, RepoRef};

/// Template of the per-environment list of a team's services.
pub const TEAM_ENVIRONMENT_KUSTOMIZATION: &str = "programme/team/environment/kustomization.yaml";
/// Template of the per-environment list of a programme's teams.
pub const PROGRAMME_ENVIRONMENT_KUSTOMIZATION: &str = "programme/environment/kustomization.yaml";

/// Merges generated aggregators with their published state.
pub struct KustomizationMerger<'a> {
    store: &'a dyn ConfigStore,
    destination: &'a RepoRef,
    visited: HashSet<String>,
}

impl<'a> KustomizationMerger<'a> {
    /// `destination` must point at the default branch of the manifests
    /// repository.
    pub fn new(store: &'a dyn ConfigStore, destination: &'a RepoRef) -> Self {
        Self {
            store,
            destination,
            visited: HashSet::new(),
        }
    }

    /// Add `reference` to the aggregator at `path`.
    pub fn merge_reference(
        &mut self,
        files: &mut GeneratedFiles,
        path: &str,
        reference: &str,
    ) -> Result<()> {
        if !files.contains(path) {
            return Ok(());
        }
        if self.visited.insert(path.to_string()) {
            if let Some(published) = self.store.get_file(self.destination, path)? {
                debug!("Merging into published {}", path);
                files.insert(path, node::parse(path, &published)?);
            }
        }
        let kustomization = files
            .get_mut(path)
            .ok_or_else(|| Error::template(path, "aggregator missing from generated files"))?;
        append_resource(kustomization, reference).map_err(|e| e.into_error(path))
    }
}

/// Execute the merge for every environment of `services`.
pub fn execute(
    store: &dyn ConfigStore,
    destination: &RepoRef,
    team: &FluxTeamConfig,
    tenant: &FluxTenant,
    services: &[&FluxService],
    files: &mut GeneratedFiles,
) -> Result<()> {
    let mut merger = KustomizationMerger::new(store, destination);
    let team_ctx = PathContext::team(&team.programme_name, &team.team_name);

    for service in services {
        let service_reference = format!("../../{}", service.name);
        for environment in &service.environments {
            if tenant.environment(&environment.name).is_none() {
                continue;
            }
            let ctx = team_ctx
                .with_service(&service.name)
                .with_environment(&environment.name);

            let team_path = output_path(TEAM_ENVIRONMENT_KUSTOMIZATION, &ctx);
            merger.merge_reference(files, &team_path, &service_reference)?;

            let programme_path = output_path(PROGRAMME_ENVIRONMENT_KUSTOMIZATION, &ctx);
            let team_reference = format!(
                "../../{}/{}",
                team.team_name,
                environment_path(&environment.name)
            );
            merger.merge_reference(files, &programme_path, &team_reference)?;
        }
    }
    Ok(())
}
