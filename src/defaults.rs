//! Default values and repository layout conventions.
//!
//! This module centralizes the paths, branch names and token defaults used
//! across the engine and the CLI so the layout is defined in one place.

use crate::config::FluxConfig;

/// Branch that published manifests and configuration live on.
pub const DEFAULT_BRANCH: &str = "main";

/// Directory holding one YAML file per team.
pub const TEAM_CONFIG_DIR: &str = "flux/services";

/// Directory holding the template library.
pub const TEMPLATES_ROOT: &str = "flux/templates";

/// Directory generated manifests are written under.
pub const OUTPUT_ROOT: &str = "services";

/// Prefix of the feature branches manifests are published on.
pub const FEATURE_BRANCH_PREFIX: &str = "features";

/// Config variable whose presence marks a service as having a datastore.
pub const DATASTORE_KEY: &str = "POSTGRES_DB";

/// Path of a team's configuration file.
pub fn team_config_path(team: &str) -> String {
    format!("{}/{}.yaml", TEAM_CONFIG_DIR, team)
}

/// Path of a tenant's configuration file.
pub fn tenant_config_path(tenant: &str) -> String {
    format!("flux/{}-config.yaml", tenant)
}

/// Placeholder version tokens injected before any environment values.
///
/// The image-automation controller rewrites these in the published
/// manifests; the `*_TAG` values carry its `$imagepolicy` marker and are
/// resolved further by the `SERVICE_NAME`, `ENVIRONMENT` and `ENV_INSTANCE`
/// tokens applied after them.
pub fn default_version_tokens() -> Vec<FluxConfig> {
    vec![
        FluxConfig::new("VERSION", "0.1.0"),
        FluxConfig::new(
            "VERSION_TAG",
            r#"0.1.0 # {"$imagepolicy": "flux-system:__SERVICE_NAME__-__ENVIRONMENT__0__ENV_INSTANCE__:tag"}"#,
        ),
        FluxConfig::new("MIGRATION_VERSION", "0.1.0"),
        FluxConfig::new(
            "MIGRATION_VERSION_TAG",
            r#"0.1.0 # {"$imagepolicy": "flux-system:__SERVICE_NAME__-dbmigration-__ENVIRONMENT__0__ENV_INSTANCE__:tag"}"#,
        ),
        FluxConfig::new("PS_EXEC_VERSION", "0.1.0"),
    ]
}
