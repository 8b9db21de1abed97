//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `flux-onboarding` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` together with the
//!   shared repository settings and calls into the `flux_onboarding` library.

use std::sync::Arc;

use flux_onboarding::store::{ConfigStore, GitCliStore};

use crate::cli::Settings;

pub mod add_environment;
pub mod add_service;
pub mod generate;
pub mod init_team;
pub mod manifest;

/// The store every command talks to: local clones under `--repos-root`.
pub fn open_store(settings: &Settings) -> Arc<dyn ConfigStore> {
    Arc::new(GitCliStore::new(&settings.repos_root))
}
