//! # Configuration and Manifest Repositories
//!
//! The engine talks to Git-hosted repositories only through the
//! [`ConfigStore`] trait. It covers the three things the engine needs:
//!
//! - **Reading** configuration and template files at a branch
//!   ([`ConfigStore::get_file`], [`ConfigStore::get_all_files`]).
//! - **Writing** a configuration file back as a whole-file commit
//!   ([`ConfigStore::write_file`]). Writes are last-writer-wins; there is no
//!   optimistic-concurrency token.
//! - **Publishing** manifests through Git objects: branches, trees, blob
//!   ids, commits and pull requests.
//!
//! Two implementations are provided. [`GitCliStore`] drives local
//! repositories through the `git` command line, the same way the rest of
//! the tooling shells out to `git`. [`MemoryStore`] keeps repositories in
//! memory and records every mutating call, which makes it the store of
//! choice for tests.
//!
//! Failures are transport errors and propagate unmodified; the store never
//! retries.

pub mod git;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use git::GitCliStore;
pub use memory::{MemoryStore, StoreCall};

/// A repository together with the branch reads and writes target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub name: String,
    pub branch: String,
}

impl RepoRef {
    pub fn new(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.branch)
    }
}

/// A resolved branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    pub name: String,
    pub sha: String,
}

/// Full content of a file to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

/// Trait for repository operations - allows swapping the Git host in tests
pub trait ConfigStore: Send + Sync {
    /// Raw content of `path` on `repo.branch`, or `None` when the file (or
    /// the branch) does not exist.
    fn get_file(&self, repo: &RepoRef, path: &str) -> Result<Option<String>>;

    /// Every file below `root` on `repo.branch`, keyed by full repository path.
    fn get_all_files(&self, repo: &RepoRef, root: &str) -> Result<BTreeMap<String, String>>;

    /// Commit `content` to `path` directly on `repo.branch`.
    fn write_file(&self, repo: &RepoRef, path: &str, content: &str, message: &str) -> Result<()>;

    /// Resolve `refs/heads/{branch}`.
    fn get_branch(&self, repo: &RepoRef, branch: &str) -> Result<Option<GitRef>>;

    /// Blob ids of every file in the tree of `commit`, keyed by path.
    fn get_tree(&self, repo: &RepoRef, commit: &str) -> Result<BTreeMap<String, String>>;

    /// The blob id `content` would have, without writing anything.
    fn hash_blob(&self, repo: &RepoRef, content: &str) -> Result<String>;

    /// Create a commit whose tree is `parent`'s tree with `files` written
    /// over it. Returns the new commit id.
    fn create_commit(
        &self,
        repo: &RepoRef,
        parent: &str,
        files: &[FileChange],
        message: &str,
    ) -> Result<String>;

    /// Create `refs/heads/{branch}` at `commit`. Fails if it already exists.
    fn create_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef>;

    /// Move an existing branch to `commit`.
    fn update_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef>;

    /// Open a pull request from `branch` into `base`. Returns whether the
    /// host accepted it.
    fn create_pull_request(
        &self,
        repo: &RepoRef,
        branch: &str,
        base: &str,
        title: &str,
    ) -> Result<bool>;
}

/// Read and deserialize a YAML configuration file, `None` when absent.
pub fn read_config<T: DeserializeOwned>(
    store: &dyn ConfigStore,
    repo: &RepoRef,
    path: &str,
) -> Result<Option<T>> {
    match store.get_file(repo, path)? {
        Some(content) => Ok(Some(serde_yaml::from_str(&content)?)),
        None => Ok(None),
    }
}

/// Serialize a configuration to YAML and commit it as a whole file.
pub fn write_config<T: Serialize>(
    store: &dyn ConfigStore,
    repo: &RepoRef,
    path: &str,
    config: &T,
    message: &str,
) -> Result<()> {
    let content = serde_yaml::to_string(config)?;
    store.write_file(repo, path, &content, message)
}
