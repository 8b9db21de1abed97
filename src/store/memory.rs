//! In-memory repositories with a log of mutating calls

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use walkdir::WalkDir;

use super::{ConfigStore, FileChange, GitRef, RepoRef};
use crate::error::{Error, Result};

/// A mutating call made against a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    WriteFile {
        repo: String,
        path: String,
    },
    CreateCommit {
        repo: String,
        parent: String,
        paths: Vec<String>,
    },
    CreateBranch {
        repo: String,
        branch: String,
        commit: String,
    },
    UpdateBranch {
        repo: String,
        branch: String,
        commit: String,
    },
    CreatePullRequest {
        repo: String,
        branch: String,
        base: String,
        title: String,
    },
}

#[derive(Debug, Clone)]
struct Commit {
    /// path -> blob id
    tree: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Repository {
    blobs: HashMap<String, String>,
    commits: HashMap<String, Commit>,
    branches: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    repos: HashMap<String, Repository>,
    calls: Vec<StoreCall>,
    commit_counter: u64,
}

/// Content-addressed in-memory Git host.
///
/// Seeding repositories with [`MemoryStore::seed`] or
/// [`MemoryStore::load_dir`] is setup and is not recorded; every other
/// mutation is recorded as a [`StoreCall`].
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    accept_pull_requests: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Blob id for `content`.
fn blob_id(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    format!("blob {}\0", content.len()).hash(&mut hasher);
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn missing_ref(repo: &str, reference: &str) -> Error {
    Error::MissingRef {
        repo: repo.to_string(),
        reference: reference.to_string(),
    }
}

impl State {
    fn repo(&self, name: &str) -> Result<&Repository> {
        self.repos
            .get(name)
            .ok_or_else(|| missing_ref(name, "repository"))
    }

    fn repo_mut(&mut self, name: &str) -> Result<&mut Repository> {
        self.repos
            .get_mut(name)
            .ok_or_else(|| missing_ref(name, "repository"))
    }

    /// Write a commit on top of `parent` (or an empty tree) and return its id.
    fn commit(&mut self, repo: &str, parent: Option<&str>, files: &[FileChange]) -> Result<String> {
        self.commit_counter += 1;
        let id = format!("commit-{:06}", self.commit_counter);
        let repository = self.repo_mut(repo)?;
        let mut tree = match parent {
            Some(parent) => {
                repository
                    .commits
                    .get(parent)
                    .ok_or_else(|| missing_ref(repo, parent))?
                    .tree
                    .clone()
            }
            None => BTreeMap::new(),
        };
        for file in files {
            let blob = blob_id(&file.content);
            repository.blobs.insert(blob.clone(), file.content.clone());
            tree.insert(file.path.clone(), blob);
        }
        repository.commits.insert(id.clone(), Commit { tree });
        Ok(id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            accept_pull_requests: true,
        }
    }

    /// A store whose pull request calls are refused by the host.
    pub fn rejecting_pull_requests() -> Self {
        Self {
            accept_pull_requests: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })
    }

    /// Commit `files` onto `repo.branch`, creating the repository and the
    /// branch when needed. Returns the new commit id.
    pub fn seed<I, P, C>(&self, repo: &RepoRef, files: I) -> Result<String>
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let files: Vec<FileChange> = files
            .into_iter()
            .map(|(path, content)| FileChange {
                path: path.into(),
                content: content.into(),
            })
            .collect();
        let mut state = self.lock()?;
        state.repos.entry(repo.name.clone()).or_default();
        let parent = state.repo(&repo.name)?.branches.get(&repo.branch).cloned();
        let commit = state.commit(&repo.name, parent.as_deref(), &files)?;
        state
            .repo_mut(&repo.name)?
            .branches
            .insert(repo.branch.clone(), commit.clone());
        Ok(commit)
    }

    /// Seed `repo` with every file below `dir`, keyed by path relative to `dir`.
    pub fn load_dir(&self, repo: &RepoRef, dir: &Path) -> Result<String> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| Error::Io(std::io::Error::other(e)))?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((path, std::fs::read_to_string(entry.path())?));
        }
        debug!("Seeding {} with {} files from {}", repo, files.len(), dir.display());
        self.seed(repo, files)
    }

    /// Content of `path` on `branch`, for assertions.
    pub fn file_on_branch(&self, repo: &str, branch: &str, path: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        let repository = state.repos.get(repo)?;
        let commit = repository.commits.get(repository.branches.get(branch)?)?;
        repository.blobs.get(commit.tree.get(path)?).cloned()
    }

    /// Every mutating call made so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Forget recorded calls, e.g. between two runs of a scenario.
    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get_file(&self, repo: &RepoRef, path: &str) -> Result<Option<String>> {
        let state = self.lock()?;
        let repository = state.repo(&repo.name)?;
        let Some(head) = repository.branches.get(&repo.branch) else {
            return Ok(None);
        };
        let commit = repository
            .commits
            .get(head)
            .ok_or_else(|| missing_ref(&repo.name, head))?;
        Ok(commit
            .tree
            .get(path)
            .and_then(|blob| repository.blobs.get(blob))
            .cloned())
    }

    fn get_all_files(&self, repo: &RepoRef, root: &str) -> Result<BTreeMap<String, String>> {
        let state = self.lock()?;
        let repository = state.repo(&repo.name)?;
        let head = repository
            .branches
            .get(&repo.branch)
            .ok_or_else(|| missing_ref(&repo.name, &repo.branch))?;
        let commit = repository
            .commits
            .get(head)
            .ok_or_else(|| missing_ref(&repo.name, head))?;
        let prefix = format!("{}/", root.trim_end_matches('/'));
        Ok(commit
            .tree
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, blob)| {
                repository
                    .blobs
                    .get(blob)
                    .map(|content| (path.clone(), content.clone()))
            })
            .collect())
    }

    fn write_file(&self, repo: &RepoRef, path: &str, content: &str, _message: &str) -> Result<()> {
        let mut state = self.lock()?;
        let parent = state.repo(&repo.name)?.branches.get(&repo.branch).cloned();
        let file = FileChange {
            path: path.to_string(),
            content: content.to_string(),
        };
        let commit = state.commit(&repo.name, parent.as_deref(), &[file])?;
        state
            .repo_mut(&repo.name)?
            .branches
            .insert(repo.branch.clone(), commit);
        state.calls.push(StoreCall::WriteFile {
            repo: repo.name.clone(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn get_branch(&self, repo: &RepoRef, branch: &str) -> Result<Option<GitRef>> {
        let state = self.lock()?;
        Ok(state
            .repo(&repo.name)?
            .branches
            .get(branch)
            .map(|sha| GitRef {
                name: branch.to_string(),
                sha: sha.clone(),
            }))
    }

    fn get_tree(&self, repo: &RepoRef, commit: &str) -> Result<BTreeMap<String, String>> {
        let state = self.lock()?;
        state
            .repo(&repo.name)?
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| missing_ref(&repo.name, commit))
    }

    fn hash_blob(&self, _repo: &RepoRef, content: &str) -> Result<String> {
        Ok(blob_id(content))
    }

    fn create_commit(
        &self,
        repo: &RepoRef,
        parent: &str,
        files: &[FileChange],
        _message: &str,
    ) -> Result<String> {
        let mut state = self.lock()?;
        let commit = state.commit(&repo.name, Some(parent), files)?;
        state.calls.push(StoreCall::CreateCommit {
            repo: repo.name.clone(),
            parent: parent.to_string(),
            paths: files.iter().map(|f| f.path.clone()).collect(),
        });
        Ok(commit)
    }

    fn create_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef> {
        let mut state = self.lock()?;
        let repository = state.repo_mut(&repo.name)?;
        if repository.branches.contains_key(branch) {
            return Err(Error::GitCommand {
                command: format!("create branch {}", branch),
                repo: repo.name.clone(),
                stderr: "Reference already exists".to_string(),
            });
        }
        if !repository.commits.contains_key(commit) {
            return Err(missing_ref(&repo.name, commit));
        }
        repository
            .branches
            .insert(branch.to_string(), commit.to_string());
        state.calls.push(StoreCall::CreateBranch {
            repo: repo.name.clone(),
            branch: branch.to_string(),
            commit: commit.to_string(),
        });
        Ok(GitRef {
            name: branch.to_string(),
            sha: commit.to_string(),
        })
    }

    fn update_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef> {
        let mut state = self.lock()?;
        let repository = state.repo_mut(&repo.name)?;
        if !repository.commits.contains_key(commit) {
            return Err(missing_ref(&repo.name, commit));
        }
        match repository.branches.get_mut(branch) {
            Some(head) => *head = commit.to_string(),
            None => return Err(missing_ref(&repo.name, branch)),
        }
        state.calls.push(StoreCall::UpdateBranch {
            repo: repo.name.clone(),
            branch: branch.to_string(),
            commit: commit.to_string(),
        });
        Ok(GitRef {
            name: branch.to_string(),
            sha: commit.to_string(),
        })
    }

    fn create_pull_request(
        &self,
        repo: &RepoRef,
        branch: &str,
        base: &str,
        title: &str,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        state.calls.push(StoreCall::CreatePullRequest {
            repo: repo.name.clone(),
            branch: branch.to_string(),
            base: base.to_string(),
            title: title.to_string(),
        });
        Ok(self.accept_pull_requests)
    }
}
