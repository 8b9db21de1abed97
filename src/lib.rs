//! # Flux Onboarding Library
//!
//! This library generates the Flux and Kustomize manifests that onboard a
//! team's services onto a GitOps pipeline, and publishes them to a Git
//! repository through a branch and pull request. It is used by the
//! `flux-onboarding` command-line tool but can be embedded in any service
//! that manages team onboarding.
//!
//! ## Quick Example
//!
//! ```
//! use flux_onboarding::config::{parse_team_config, parse_tenant};
//! use flux_onboarding::phases::assembly;
//! use flux_onboarding::node;
//! use flux_onboarding::templates::TemplateTree;
//!
//! let team = parse_team_config(r#"
//! serviceCode: FFC
//! programmeName: ffc
//! teamName: ffc-demo
//! services:
//!   - name: ffc-demo-web
//!     type: Frontend
//!     environments:
//!       - name: snd1
//! "#).unwrap();
//! let tenant = parse_tenant("environments:\n  - name: snd1\n").unwrap();
//!
//! let mut templates = TemplateTree::new();
//! let path = "programme/team/service/deploy/environment/patch.yaml";
//! templates.insert(path.to_string(), node::parse(path, "name: __SERVICE_NAME__-__ENVIRONMENT__").unwrap());
//!
//! let services: Vec<_> = team.services.iter().collect();
//! let files = assembly::execute(&team, &tenant, &templates, &services).unwrap();
//! assert_eq!(files.paths(), vec!["services/ffc/ffc-demo/ffc-demo-web/deploy/snd/01/patch.yaml"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: Tenants, teams, services, environments and
//!   the key/value tokens they carry.
//! - **Template trees (`node`, `tokens`, `path`)**: Templates are parsed into a
//!   generic YAML tree, `__KEY__` tokens are substituted in string scalars,
//!   and placeholder path segments are rewritten per team, service and
//!   environment.
//! - **Stores (`store`, `templates`, `cache`)**: Git repositories are reached
//!   through the `ConfigStore` trait; templates are cached until the next UTC
//!   midnight.
//! - **Phases (`phases`)**: Assembly, kustomization merge and publishing,
//!   driven by the `phases::orchestrator`.
//! - **Team mutations (`teams`)**: Whole-file updates of team configuration.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: Read the tenant and team configuration.
//! 2.  **Assemble**: Expand the cached templates into a set of generated files.
//! 3.  **Merge**: Add the team's services to the published aggregator
//!     kustomizations.
//! 4.  **Publish**: Commit the changed files to a feature branch and open a
//!     pull request, or do nothing when the published state already matches.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod files;
pub mod node;
pub mod output;
pub mod path;
pub mod phases;
pub mod store;
pub mod teams;
pub mod templates;
pub mod tokens;

#[cfg(test)]
mod tokens_proptest;
