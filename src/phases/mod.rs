//! The phases of a manifest generation run.
//!
//! ## Overview
//!
//! A run follows 4 phases:
//! 1. Assembly - Expand templates for the team, its services and their environments
//! 2. Kustomization merge - Merge shared aggregators with their published copies
//! 3. Publish - Commit the changed files to a feature branch and open a pull request
//! 4. Orchestration - Load configuration and drive phases 1-3 for one request
//!
//! Templates are fetched through the cached [`TemplateStore`](crate::templates::TemplateStore)
//! before phase 1, so there is no separate fetch phase.
//!
//! Each phase depends only on the previous phases and the foundation modules
//! (`node`, `tokens`, `path`, `files`, `store`).

pub mod assembly;
pub mod kustomization;
pub mod orchestrator;
pub mod publish;

pub use orchestrator::{GenerationRequest, GenerationResult, ManifestGenerator};
pub use publish::PublishOutcome;
