//! # Error Handling
//!
//! This module defines the centralized error type for the onboarding engine.
//! It uses the `thiserror` library to build a single `Error` enum covering
//! every failure mode the library can surface.
//!
//! ## Error classes
//!
//! The engine distinguishes three kinds of failure:
//!
//! - **Not found**: a missing team or tenant config, or no published copy of
//!   an aggregator file. These are *not* errors; they are reported through
//!   [`GenerationResult`](crate::phases::orchestrator::GenerationResult) or
//!   handled as the absent-file branch of the kustomization merge.
//! - **Structural** ([`Error::Template`]): a template holds the wrong shape
//!   where the assembly pipeline expects a list or a map. These are fatal and
//!   are never caught internally.
//! - **Transport** ([`Error::GitCommand`]): any Git host failure, propagated
//!   unmodified with no retry.
//!
//! The `Result<T>` alias is used throughout the library.

use thiserror::Error;

/// Main error type for manifest generation and publishing
#[derive(Error, Debug)]
pub enum Error {
    /// A template file has the wrong structure for an edit the pipeline
    /// applies to it, or could not be parsed at all.
    #[error("Template structure error in {path}: {message}")]
    Template { path: String, message: String },

    /// A Git command failed against a repository.
    #[error("Git command failed for {repo}: {command} - {stderr}")]
    GitCommand {
        command: String,
        repo: String,
        stderr: String,
    },

    /// A Git reference that must exist (usually the default branch) is missing.
    #[error("Git reference not found in {repo}: {reference}")]
    MissingRef { repo: String, reference: String },

    /// A requested mutation conflicts with the team configuration, such as a
    /// duplicate service name.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A configuration file required by a mutation does not exist.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Build a structural template error for `path`.
    pub fn template(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Template {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true for the fatal structural class of errors.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Template { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
