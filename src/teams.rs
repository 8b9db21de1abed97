//! Team configuration mutations
//!
//! Every mutation reads the team's whole configuration file, changes it in
//! memory and writes the whole file back. Concurrent mutations of the same
//! team are last-writer-wins; there is no concurrency token.

use log::info;

use crate::config::{FluxConfig, FluxEnvironment, FluxService, FluxTeamConfig};
use crate::defaults::team_config_path;
use crate::error::{Error, Result};
use crate::store::{read_config, write_config, ConfigStore, RepoRef};

/// Team configuration access on one configuration repository.
pub struct TeamConfigService<'a> {
    store: &'a dyn ConfigStore,
    repo: &'a RepoRef,
}

impl<'a> TeamConfigService<'a> {
    pub fn new(store: &'a dyn ConfigStore, repo: &'a RepoRef) -> Self {
        Self { store, repo }
    }

    /// The configuration of `team`, `None` when it has none.
    pub fn get(&self, team: &str) -> Result<Option<FluxTeamConfig>> {
        read_config(self.store, self.repo, &team_config_path(team))
    }

    fn load(&self, team: &str) -> Result<FluxTeamConfig> {
        self.get(team)?.ok_or_else(|| Error::ConfigNotFound {
            path: team_config_path(team),
        })
    }

    fn save(&self, team: &str, config: &FluxTeamConfig, message: &str) -> Result<()> {
        write_config(self.store, self.repo, &team_config_path(team), config, message)?;
        info!("{}", message);
        Ok(())
    }

    /// Create the configuration file for a new team.
    pub fn create_team(&self, config: &FluxTeamConfig) -> Result<()> {
        if self.get(&config.team_name)?.is_some() {
            return Err(Error::Validation {
                message: format!("Team '{}' already has a Flux configuration", config.team_name),
            });
        }
        let mut names: Vec<&str> = Vec::with_capacity(config.services.len());
        for service in &config.services {
            if names.contains(&service.name.as_str()) {
                return Err(Error::Validation {
                    message: format!(
                        "Service '{}' appears more than once in team '{}'",
                        service.name, config.team_name
                    ),
                });
            }
            names.push(&service.name);
            check_environments(service)?;
        }
        self.save(
            &config.team_name,
            config,
            &format!("Add Flux configuration for {}", config.team_name),
        )
    }

    /// Add a service to `team`. Service names are unique within a team.
    pub fn add_service(&self, team: &str, service: FluxService) -> Result<FluxTeamConfig> {
        let mut config = self.load(team)?;
        if config.service(&service.name).is_some() {
            return Err(Error::Validation {
                message: format!("Service '{}' already exists in team '{}'", service.name, team),
            });
        }
        check_environments(&service)?;
        let message = format!("Add service {} to {}", service.name, team);
        config.services.push(service);
        self.save(team, &config, &message)?;
        Ok(config)
    }

    /// Add an environment to a service. Environment names are unique within
    /// a service.
    pub fn add_environment(
        &self,
        team: &str,
        service: &str,
        environment: FluxEnvironment,
    ) -> Result<FluxTeamConfig> {
        let mut config = self.load(team)?;
        let target = find_service(&mut config, team, service)?;
        if target.environment(&environment.name).is_some() {
            return Err(Error::Validation {
                message: format!(
                    "Environment '{}' already exists for service '{}'",
                    environment.name, service
                ),
            });
        }
        let message = format!("Add environment {} to {}", environment.name, service);
        target.environments.push(environment);
        self.save(team, &config, &message)?;
        Ok(config)
    }

    /// Add or replace service config variables, matched by key.
    pub fn set_service_variables(
        &self,
        team: &str,
        service: &str,
        variables: Vec<FluxConfig>,
    ) -> Result<FluxTeamConfig> {
        let mut config = self.load(team)?;
        let target = find_service(&mut config, team, service)?;
        for variable in variables {
            match target.config_variables.iter_mut().find(|v| v.key == variable.key) {
                Some(existing) => existing.value = variable.value,
                None => target.config_variables.push(variable),
            }
        }
        let message = format!("Update config variables of {}", service);
        self.save(team, &config, &message)?;
        Ok(config)
    }

    /// Set the manifest flags of a service environment.
    ///
    /// `generated_version` is left as is when `None`.
    pub fn set_manifest(
        &self,
        team: &str,
        service: &str,
        environment: &str,
        generate: bool,
        generated_version: Option<&str>,
    ) -> Result<FluxTeamConfig> {
        let mut config = self.load(team)?;
        let target = find_service(&mut config, team, service)?;
        let env = target
            .environment_mut(environment)
            .ok_or_else(|| Error::Validation {
                message: format!(
                    "Environment '{}' not found for service '{}'",
                    environment, service
                ),
            })?;
        env.manifest.generate = generate;
        if let Some(version) = generated_version {
            env.manifest.generated_version = version.to_string();
        }
        let message = format!("Update manifest of {} in {}", service, environment);
        self.save(team, &config, &message)?;
        Ok(config)
    }
}

fn check_environments(service: &FluxService) -> Result<()> {
    for (i, environment) in service.environments.iter().enumerate() {
        if service.environments[..i].iter().any(|e| e.name == environment.name) {
            return Err(Error::Validation {
                message: format!(
                    "Environment '{}' appears more than once for service '{}'",
                    environment.name, service.name
                ),
            });
        }
    }
    Ok(())
}

fn find_service<'c>(config: &'c mut FluxTeamConfig, team: &str, service: &str) -> Result<&'c mut FluxService> {
    config.service_mut(service).ok_or_else(|| Error::Validation {
        message: format!("Service '{}' not found in team '{}'", service, team),
    })
}
