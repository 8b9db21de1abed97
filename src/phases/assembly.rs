//! Manifest Assembly
//!
//! Turns a team configuration, its tenant and the template library into the
//! set of generated manifests.
//!
//! ## Process
//!
//! 1.  **Team scope**: templates with neither a `service` nor an
//!     `environment` segment are copied once for the team.
//!
//! 2.  **Service scope**: templates with a `service` segment but no
//!     `environment` segment are copied once per service, after the
//!     service-type inclusion rules and structural edits.
//!
//! 3.  **Environment scope**: templates with an `environment` segment are
//!     expanded once per service environment that also exists in the
//!     tenant, then the environment tokens are applied to those copies.
//!
//! 4.  **Service tokens** are applied to every file the service produced,
//!     and **team tokens** last, across the whole set.
//!
//! An output path is only generated once; later writes to the same path are
//! skipped, so per-environment aggregators shared by several services keep
//! the content of the first service that produced them.

use log::debug;

use crate::config::{FluxConfig, FluxEnvironment, FluxService, FluxServiceType, FluxTeamConfig, FluxTenant};
use crate::defaults::default_version_tokens;
use crate::error::Result;
use crate::files::GeneratedFiles;
use crate::node::{ShapeError, TemplateNode};
use crate::path::{self, output_path, PathContext, ENVIRONMENT_SEGMENT, SERVICE_SEGMENT};
use crate::templates::TemplateTree;

/// Kustomization listing a service's deployment stages.
pub const SERVICE_KUSTOMIZATION: &str = "programme/team/service/kustomization.yaml";
/// Flux Kustomization for the service's Helm release.
pub const DEPLOY_KUSTOMIZE: &str = "programme/team/service/deploy-kustomize.yaml";
/// Per-environment values patch for the Helm release.
pub const DEPLOY_PATCH: &str = "programme/team/service/deploy/environment/patch.yaml";
/// Per-environment values patch for the infrastructure release.
pub const INFRA_PATCH: &str = "programme/team/service/infra/environment/patch.yaml";

/// Templates that only apply to services with a datastore.
pub const PRE_DEPLOY_PATTERNS: [&str; 2] = [
    "programme/team/service/pre-deploy/**",
    "programme/team/service/pre-deploy-kustomize.yaml",
];
/// Templates that never apply to HelmOnly services.
pub const INFRA_PATTERNS: [&str; 2] = [
    "programme/team/service/infra/**",
    "programme/team/service/infra-kustomize.yaml",
];

pub const PRE_DEPLOY_RESOURCE: &str = "pre-deploy-kustomize.yaml";
pub const INFRA_RESOURCE: &str = "infra-kustomize.yaml";

/// How often a template is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Once per team
    Team,
    /// Once per service
    Service,
    /// Once per (service, environment) pair
    Environment,
}

impl Scope {
    pub fn of(template_path: &str) -> Self {
        if path::has_segment(template_path, ENVIRONMENT_SEGMENT) {
            Scope::Environment
        } else if path::has_segment(template_path, SERVICE_SEGMENT) {
            Scope::Service
        } else {
            Scope::Team
        }
    }
}

/// Execute manifest assembly for `services` of `team`.
///
/// `services` is usually every service of the team; the single-service
/// flow passes just one. Team-scope templates are generated either way.
pub fn execute(
    team: &FluxTeamConfig,
    tenant: &FluxTenant,
    templates: &TemplateTree,
    services: &[&FluxService],
) -> Result<GeneratedFiles> {
    let team_ctx = PathContext::team(&team.programme_name, &team.team_name);
    let mut files = GeneratedFiles::new();

    for (template_path, node) in templates_in(templates, Scope::Team) {
        files.insert_if_absent(output_path(template_path, &team_ctx), node.clone());
    }

    for service in services {
        let service_ctx = team_ctx.with_service(&service.name);
        let mut service_files = GeneratedFiles::new();

        for (template_path, node) in templates_in(templates, Scope::Service) {
            let target = output_path(template_path, &service_ctx);
            if files.contains(&target) || !is_included(template_path, service)? {
                continue;
            }
            service_files.insert_if_absent(target, edited(template_path, node, service)?);
        }

        for environment in &service.environments {
            let Some(tenant_environment) = tenant.environment(&environment.name) else {
                debug!(
                    "Skipping environment {} of {}: not in tenant",
                    environment.name, service.name
                );
                continue;
            };
            let env_ctx = service_ctx.with_environment(&environment.name);
            let mut environment_files = GeneratedFiles::new();

            for (template_path, node) in templates_in(templates, Scope::Environment) {
                let target = output_path(template_path, &env_ctx);
                if files.contains(&target)
                    || service_files.contains(&target)
                    || !is_included(template_path, service)?
                {
                    continue;
                }
                environment_files
                    .insert_if_absent(target, edited(template_path, node, service)?);
            }

            environment_files.substitute_all(&environment_tokens(environment, tenant_environment));
            service_files.absorb(environment_files);
        }

        service_files.substitute_all(&service_tokens(service));
        debug!("Generated {} files for {}", service_files.len(), service.name);
        files.absorb(service_files);
    }

    files.substitute_all(&team_tokens(team, tenant));
    Ok(files)
}

fn templates_in(templates: &TemplateTree, scope: Scope) -> impl Iterator<Item = (&str, &TemplateNode)> {
    templates
        .iter()
        .filter(move |(path, _)| Scope::of(path) == scope)
        .map(|(path, node)| (path.as_str(), node))
}

fn matches_any(patterns: &[&str], template_path: &str) -> Result<bool> {
    for pattern in patterns {
        if path::glob_match(pattern, template_path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Whether `service` receives the template at `template_path`.
pub fn is_included(template_path: &str, service: &FluxService) -> Result<bool> {
    if !service.has_datastore() && matches_any(&PRE_DEPLOY_PATTERNS, template_path)? {
        return Ok(false);
    }
    if service.is_helm_only() && matches_any(&INFRA_PATTERNS, template_path)? {
        return Ok(false);
    }
    Ok(true)
}

fn edited(template_path: &str, node: &TemplateNode, service: &FluxService) -> Result<TemplateNode> {
    let mut node = node.clone();
    apply_edits(template_path, &mut node, service).map_err(|e| e.into_error(template_path))?;
    Ok(node)
}

/// Apply the service-type structural edits for `template_path` to `node`.
pub fn apply_edits(
    template_path: &str,
    node: &mut TemplateNode,
    service: &FluxService,
) -> std::result::Result<(), ShapeError> {
    match template_path {
        SERVICE_KUSTOMIZATION => {
            if service.has_datastore() {
                append_resource(node, PRE_DEPLOY_RESOURCE)?;
            }
            if service.is_helm_only() {
                remove_resource(node, INFRA_RESOURCE)?;
            }
        }
        DEPLOY_KUSTOMIZE if service.is_helm_only() => {
            if let Some(spec) = node.mapping_at_mut(&["spec"])? {
                spec.remove("dependsOn");
            }
        }
        DEPLOY_PATCH if service.service_type == FluxServiceType::Backend => {
            if let Some(values) = node.mapping_at_mut(&["spec", "values"])? {
                values.remove("labels");
                values.remove("ingress");
            }
        }
        INFRA_PATCH if service.service_type == FluxServiceType::Frontend => {
            if let Some(values) = node.mapping_at_mut(&["spec", "values"])? {
                values.remove("postgresResourceGroupName");
                values.remove("postgresServerName");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Append `resource` to the `resources` list unless it is already there.
///
/// A missing list is created.
pub fn append_resource(node: &mut TemplateNode, resource: &str) -> std::result::Result<(), ShapeError> {
    let resources = node.sequence_entry_mut("resources")?;
    if !resources.iter().any(|r| r.as_str() == Some(resource)) {
        resources.push(TemplateNode::string(resource));
    }
    Ok(())
}

/// Remove every `resource` entry from the `resources` list, if there is one.
pub fn remove_resource(node: &mut TemplateNode, resource: &str) -> std::result::Result<(), ShapeError> {
    match node.get_path_mut(&["resources"])? {
        None => Ok(()),
        Some(TemplateNode::Sequence(items)) => {
            items.retain(|r| r.as_str() != Some(resource));
            Ok(())
        }
        Some(other) => Err(ShapeError {
            location: "resources".to_string(),
            expected: "Sequence",
            found: other.kind_name(),
        }),
    }
}

/// Tokens for one service environment, in application order.
pub fn environment_tokens(environment: &FluxEnvironment, tenant_environment: &FluxEnvironment) -> Vec<FluxConfig> {
    let (family, instance) = path::split_environment(&environment.name);
    let mut tokens = default_version_tokens();
    tokens.push(FluxConfig::new("ENVIRONMENT", family));
    tokens.push(FluxConfig::new("ENV_INSTANCE", instance));
    tokens.extend(environment.config_variables.iter().cloned());
    tokens.extend(tenant_environment.config_variables.iter().cloned());
    tokens
}

/// Value of the `DEPENDS_ON` token: the stage the Helm release waits for.
pub fn depends_on(service: &FluxService) -> Option<&'static str> {
    if service.is_helm_only() {
        None
    } else if service.has_datastore() {
        Some("pre-deploy")
    } else {
        Some("infra")
    }
}

/// Tokens applied to every file a service produced.
pub fn service_tokens(service: &FluxService) -> Vec<FluxConfig> {
    let mut tokens = Vec::new();
    if let Some(stage) = depends_on(service) {
        tokens.push(FluxConfig::new("DEPENDS_ON", stage));
    }
    tokens.push(FluxConfig::new("SERVICE_NAME", &service.name));
    tokens.extend(service.config_variables.iter().cloned());
    tokens
}

/// Tokens applied last, across every generated file.
pub fn team_tokens(team: &FluxTeamConfig, tenant: &FluxTenant) -> Vec<FluxConfig> {
    let mut tokens = vec![
        FluxConfig::new("PROGRAMME_NAME", &team.programme_name),
        FluxConfig::new("TEAM_NAME", &team.team_name),
        FluxConfig::new("SERVICE_CODE", &team.service_code),
    ];
    tokens.extend(team.config_variables.iter().cloned());
    tokens.extend(tenant.config_variables.iter().cloned());
    tokens
}
