//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = StoreFixture::new();
//!     let result = fixture.generate(GenerationRequest::new("snd", "ffc-demo"));
//!     // ... assertions
//! }
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use assert_fs::prelude::*;
use flux_onboarding::phases::{GenerationRequest, GenerationResult, ManifestGenerator};
use flux_onboarding::store::{MemoryStore, RepoRef, StoreCall};
use flux_onboarding::templates::TemplateStore;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, GitFixture, StoreFixture};
}

/// Configuration repository name used by every fixture.
pub const CONFIG_REPO: &str = "adp-flux-core";
/// Manifests repository name used by every fixture.
pub const SERVICES_REPO: &str = "adp-flux-services";

/// Directory with the fixture configuration repository: templates, the
/// `snd` tenant and the `ffc-demo` team.
pub fn config_repo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/config-repo")
}

pub fn config_repo() -> RepoRef {
    RepoRef::new(CONFIG_REPO, "main")
}

pub fn services_repo() -> RepoRef {
    RepoRef::new(SERVICES_REPO, "main")
}

/// An in-memory configuration and manifests repository pair.
pub struct StoreFixture {
    pub store: Arc<MemoryStore>,
}

impl StoreFixture {
    /// Seed the configuration repository from `tests/testdata` and the
    /// manifests repository with a README.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Same as [`StoreFixture::new`] with pull requests refused.
    pub fn rejecting_pull_requests() -> Self {
        Self::with_store(MemoryStore::rejecting_pull_requests())
    }

    fn with_store(store: MemoryStore) -> Self {
        store
            .load_dir(&config_repo(), &config_repo_dir())
            .expect("Failed to seed config repository");
        store
            .seed(&services_repo(), vec![("README.md", "# Flux services\n")])
            .expect("Failed to seed services repository");
        Self {
            store: Arc::new(store),
        }
    }

    /// Publish a file on the manifests repository's default branch.
    pub fn with_published(self, path: &str, content: &str) -> Self {
        self.store
            .seed(&services_repo(), vec![(path, content)])
            .expect("Failed to seed published file");
        self.store.clear_calls();
        self
    }

    pub fn generator(&self) -> ManifestGenerator {
        let templates = TemplateStore::new(self.store.clone(), config_repo());
        ManifestGenerator::new(self.store.clone(), templates, config_repo(), services_repo())
    }

    pub fn generate(&self, request: GenerationRequest) -> GenerationResult {
        self.generator()
            .generate(&request)
            .expect("Generation failed")
    }

    /// Content of `path` on `branch` of the manifests repository.
    pub fn published(&self, branch: &str, path: &str) -> Option<String> {
        self.store.file_on_branch(SERVICES_REPO, branch, path)
    }

    /// Mutating calls other than configuration writes.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.store
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, StoreCall::WriteFile { .. }))
            .collect()
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether a usable `git` binary is on the path.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary repos root with bare Git repositories for the CLI.
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
}

impl GitFixture {
    /// Create empty bare repositories named `repos`.
    pub fn new(repos: &[&str]) -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        for repo in repos {
            let status = Command::new("git")
                .args(["init", "--quiet", "--bare"])
                .arg(temp_dir.path().join(repo))
                .status()
                .expect("Failed to run git init");
            assert!(status.success(), "git init failed for {}", repo);
        }
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command rooted at this fixture with a fixed Git identity.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("flux-onboarding");
        cmd.arg("--repos-root")
            .arg(self.path())
            .arg("--color")
            .arg("never")
            .env("GIT_AUTHOR_NAME", "Flux Onboarding")
            .env("GIT_AUTHOR_EMAIL", "flux@example.com")
            .env("GIT_COMMITTER_NAME", "Flux Onboarding")
            .env("GIT_COMMITTER_EMAIL", "flux@example.com")
            .env_remove("FLUX_ONBOARDING_CONFIG_REPO")
            .env_remove("FLUX_ONBOARDING_SERVICES_REPO")
            .env_remove("FLUX_ONBOARDING_TEMPLATES_REPO");
        cmd
    }

    /// Read `path` from `branch` of `repo`.
    pub fn show(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.path().join(repo))
            .args(["show", &format!("{}:{}", branch, path)])
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_seeds_config_repo() {
        let fixture = StoreFixture::new();
        assert!(fixture
            .store
            .file_on_branch(CONFIG_REPO, "main", "flux/services/ffc-demo.yaml")
            .is_some());
        assert!(fixture.store.calls().is_empty());
    }

    #[test]
    fn test_testdata_is_valid_yaml() {
        for entry in walkdir::WalkDir::new(config_repo_dir()) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let content = std::fs::read_to_string(entry.path()).unwrap();
                serde_yaml::from_str::<serde_yaml::Value>(&content)
                    .unwrap_or_else(|e| panic!("{} is not valid YAML: {}", entry.path().display(), e));
            }
        }
    }
}
