//! # Team and Tenant Configuration
//!
//! This module defines the data structures stored in the configuration
//! repository and the logic for parsing and serializing them.
//!
//! ## Key Components
//!
//! - **`FluxTenant`**: one per deployment realm. Its environment list is the
//!   allow-list every service environment is joined against.
//! - **`FluxTeamConfig`**: one YAML file per team (`flux/services/{team}.yaml`),
//!   holding the team's services. It is the unit of persistence: every
//!   mutation rewrites the whole file.
//! - **`FluxService`**, **`FluxEnvironment`**, **`FluxConfig`**: the nested
//!   pieces. A `FluxConfig` is a substitution token.
//!
//! All field names are camelCase in YAML; lists default to empty.

use crate::defaults::DATASTORE_KEY;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A key/value substitution token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluxConfig {
    pub key: String,
    pub value: String,
}

impl FluxConfig {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for FluxConfig {
    type Err = String;

    /// Parses `KEY=VALUE`. The value may itself contain `=`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(FluxConfig::new(key, value)),
            _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
        }
    }
}

/// Manifest generation state recorded per environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxManifest {
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub generated_version: String,
}

/// A deployment environment such as `snd1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxEnvironment {
    pub name: String,
    #[serde(default)]
    pub config_variables: Vec<FluxConfig>,
    #[serde(default)]
    pub manifest: FluxManifest,
}

impl FluxEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_variables: Vec::new(),
            manifest: FluxManifest::default(),
        }
    }
}

/// How a service is deployed, which decides the templates it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluxServiceType {
    Frontend,
    Backend,
    HelmOnly,
}

impl fmt::Display for FluxServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FluxServiceType::Frontend => "Frontend",
            FluxServiceType::Backend => "Backend",
            FluxServiceType::HelmOnly => "HelmOnly",
        };
        f.write_str(name)
    }
}

impl FromStr for FluxServiceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frontend" => Ok(FluxServiceType::Frontend),
            "backend" => Ok(FluxServiceType::Backend),
            "helmonly" | "helm-only" => Ok(FluxServiceType::HelmOnly),
            _ => Err(format!(
                "unknown service type '{}' (expected Frontend, Backend or HelmOnly)",
                s
            )),
        }
    }
}

/// A deployable service owned by a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxService {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: FluxServiceType,
    #[serde(default)]
    pub environments: Vec<FluxEnvironment>,
    #[serde(default)]
    pub config_variables: Vec<FluxConfig>,
}

impl FluxService {
    pub fn new(name: impl Into<String>, service_type: FluxServiceType) -> Self {
        Self {
            name: name.into(),
            service_type,
            environments: Vec::new(),
            config_variables: Vec::new(),
        }
    }

    /// A service has a datastore when it declares `POSTGRES_DB`.
    pub fn has_datastore(&self) -> bool {
        self.config_variables.iter().any(|c| c.key == DATASTORE_KEY)
    }

    pub fn is_helm_only(&self) -> bool {
        self.service_type == FluxServiceType::HelmOnly
    }

    pub fn environment(&self, name: &str) -> Option<&FluxEnvironment> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn environment_mut(&mut self, name: &str) -> Option<&mut FluxEnvironment> {
        self.environments.iter_mut().find(|e| e.name == name)
    }
}

/// The per-team configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxTeamConfig {
    pub service_code: String,
    pub programme_name: String,
    pub team_name: String,
    #[serde(default)]
    pub services: Vec<FluxService>,
    #[serde(default)]
    pub config_variables: Vec<FluxConfig>,
}

impl FluxTeamConfig {
    pub fn service(&self, name: &str) -> Option<&FluxService> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_mut(&mut self, name: &str) -> Option<&mut FluxService> {
        self.services.iter_mut().find(|s| s.name == name)
    }
}

/// The per-tenant configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxTenant {
    #[serde(default)]
    pub environments: Vec<FluxEnvironment>,
    #[serde(default)]
    pub config_variables: Vec<FluxConfig>,
}

impl FluxTenant {
    /// The tenant environment with exactly this name.
    pub fn environment(&self, name: &str) -> Option<&FluxEnvironment> {
        self.environments.iter().find(|e| e.name == name)
    }
}

/// Parse a team configuration from YAML.
pub fn parse_team_config(yaml: &str) -> Result<FluxTeamConfig> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse a tenant configuration from YAML.
pub fn parse_tenant(yaml: &str) -> Result<FluxTenant> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Serialize a configuration back to YAML.
pub fn to_yaml<T: Serialize>(config: &T) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEAM: &str = r#"
serviceCode: FFC
programmeName: ffc
teamName: ffc-demo
configVariables:
  - key: TEAM_CONTACT
    value: ffc@example.com
services:
  - name: ffc-demo-web
    type: Frontend
    environments:
      - name: snd1
        manifest:
          generate: true
  - name: ffc-demo-claim
    type: Backend
    configVariables:
      - key: POSTGRES_DB
        value: ffc_demo_claim
    environments:
      - name: snd1
      - name: dev1
"#;

    #[test]
    fn test_parse_team_config() {
        let team = parse_team_config(TEAM).unwrap();
        assert_eq!(team.team_name, "ffc-demo");
        assert_eq!(team.programme_name, "ffc");
        assert_eq!(team.service_code, "FFC");
        assert_eq!(team.services.len(), 2);
        assert_eq!(team.config_variables.len(), 1);

        let web = team.service("ffc-demo-web").unwrap();
        assert_eq!(web.service_type, FluxServiceType::Frontend);
        assert!(web.environment("snd1").unwrap().manifest.generate);
        assert!(!web.has_datastore());

        let claim = team.service("ffc-demo-claim").unwrap();
        assert!(claim.has_datastore());
        assert!(!claim.environment("dev1").unwrap().manifest.generate);
    }

    #[test]
    fn test_parse_tenant_defaults() {
        let tenant = parse_tenant("environments:\n  - name: snd1\n").unwrap();
        assert_eq!(tenant.environments.len(), 1);
        assert!(tenant.config_variables.is_empty());
        assert!(tenant.environment("snd1").is_some());
        assert!(tenant.environment("snd").is_none());
    }

    #[test]
    fn test_parse_team_config_unknown_type() {
        let yaml = "serviceCode: A\nprogrammeName: p\nteamName: t\nservices:\n  - name: s\n    type: Lambda\n";
        assert!(parse_team_config(yaml).is_err());
    }

    #[test]
    fn test_team_config_roundtrip_uses_camel_case() {
        let team = parse_team_config(TEAM).unwrap();
        let yaml = to_yaml(&team).unwrap();
        assert!(yaml.contains("programmeName: ffc"));
        assert!(yaml.contains("generatedVersion"));
        assert!(yaml.contains("type: HelmOnly") || yaml.contains("type: Frontend"));
        assert_eq!(parse_team_config(&yaml).unwrap(), team);
    }

    #[test]
    fn test_helm_only() {
        let service = FluxService::new("chart", FluxServiceType::HelmOnly);
        assert!(service.is_helm_only());
    }

    #[test]
    fn test_service_type_from_str() {
        assert_eq!("backend".parse::<FluxServiceType>().unwrap(), FluxServiceType::Backend);
        assert_eq!("HelmOnly".parse::<FluxServiceType>().unwrap(), FluxServiceType::HelmOnly);
        assert!("lambda".parse::<FluxServiceType>().is_err());
    }

    #[test]
    fn test_flux_config_from_str() {
        let token: FluxConfig = "POSTGRES_DB=claims=v2".parse().unwrap();
        assert_eq!(token.key, "POSTGRES_DB");
        assert_eq!(token.value, "claims=v2");
        assert!("=value".parse::<FluxConfig>().is_err());
        assert!("novalue".parse::<FluxConfig>().is_err());
    }
}
