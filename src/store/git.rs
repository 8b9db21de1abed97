//! [`ConfigStore`] over local repositories, driven through the `git` CLI.
//!
//! Each repository name maps to a directory under the store root (bare or
//! not; only plumbing commands are used, so the work tree is never
//! touched). Commits are built in a throwaway index file, which keeps
//! concurrent runs from stepping on the repository's own index.
//!
//! Using the system `git` means authentication, signing and hooks follow
//! whatever the host has configured in `~/.gitconfig`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::{debug, warn};

use super::{ConfigStore, FileChange, GitRef, RepoRef};
use crate::error::{Error, Result};

const FILE_MODE: &str = "100644";

/// Git-backed store rooted at a directory of repositories.
#[derive(Debug, Clone)]
pub struct GitCliStore {
    root: PathBuf,
    identity: Option<(String, String)>,
    pull_request_cli: String,
}

impl GitCliStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            identity: None,
            pull_request_cli: "gh".to_string(),
        }
    }

    /// Open pull requests with `program` instead of `gh`. It is invoked with
    /// `gh pr create` arguments.
    pub fn with_pull_request_cli(mut self, program: impl Into<String>) -> Self {
        self.pull_request_cli = program.into();
        self
    }

    /// Author and commit as `name <email>` instead of the Git configuration.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some((name.into(), email.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_dir(&self, repo: &RepoRef) -> PathBuf {
        self.root.join(&repo.name)
    }

    fn command(&self, repo: &RepoRef, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(self.repo_dir(repo)).args(args);
        if let Some((name, email)) = &self.identity {
            command
                .env("GIT_AUTHOR_NAME", name)
                .env("GIT_AUTHOR_EMAIL", email)
                .env("GIT_COMMITTER_NAME", name)
                .env("GIT_COMMITTER_EMAIL", email);
        }
        command
    }

    /// Run a command, returning its raw output whatever the exit status.
    fn output(&self, repo: &RepoRef, mut command: Command, stdin: Option<&str>) -> Result<Output> {
        let description = describe(&command);
        debug!("Running git {} in {}", description, repo.name);
        command
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|e| Error::GitCommand {
            command: description.clone(),
            repo: repo.name.clone(),
            stderr: e.to_string(),
        })?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())?;
        }
        Ok(child.wait_with_output()?)
    }

    /// Run a command that must succeed and return its trimmed stdout.
    fn run(&self, repo: &RepoRef, command: Command, stdin: Option<&str>) -> Result<String> {
        let description = describe(&command);
        let output = self.output(repo, command, stdin)?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: description,
                repo: repo.name.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn git(&self, repo: &RepoRef, args: &[&str]) -> Result<String> {
        self.run(repo, self.command(repo, args), None)
    }

    fn ensure_repo(&self, repo: &RepoRef) -> Result<()> {
        if self.repo_dir(repo).is_dir() {
            Ok(())
        } else {
            Err(Error::MissingRef {
                repo: repo.name.clone(),
                reference: "repository".to_string(),
            })
        }
    }

    fn resolve_branch(&self, repo: &RepoRef, branch: &str) -> Result<Option<String>> {
        self.ensure_repo(repo)?;
        let reference = format!("refs/heads/{}", branch);
        let command = self.command(repo, &["rev-parse", "--verify", "--quiet", &reference]);
        let output = self.output(repo, command, None)?;
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(Error::GitCommand {
                command: format!("rev-parse --verify {}", reference),
                repo: repo.name.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    /// Build a commit with `files` written over `parent`'s tree (or an empty
    /// tree for a root commit) in a temporary index.
    fn commit_files(
        &self,
        repo: &RepoRef,
        parent: Option<&str>,
        files: &[FileChange],
        message: &str,
    ) -> Result<String> {
        let scratch = tempfile::tempdir()?;
        let index = scratch.path().join("index");
        let with_index = |args: &[&str]| {
            let mut command = self.command(repo, args);
            command.env("GIT_INDEX_FILE", &index);
            command
        };

        match parent {
            Some(parent) => self.run(repo, with_index(&["read-tree", parent]), None)?,
            None => self.run(repo, with_index(&["read-tree", "--empty"]), None)?,
        };
        for file in files {
            let blob = self.run(
                repo,
                self.command(repo, &["hash-object", "-w", "--stdin"]),
                Some(&file.content),
            )?;
            let cacheinfo = format!("{},{},{}", FILE_MODE, blob, file.path);
            self.run(
                repo,
                with_index(&["update-index", "--add", "--cacheinfo", &cacheinfo]),
                None,
            )?;
        }
        let tree = self.run(repo, with_index(&["write-tree"]), None)?;

        let mut args = vec!["commit-tree", tree.as_str()];
        if let Some(parent) = parent {
            args.extend(["-p", parent]);
        }
        args.extend(["-m", message]);
        self.git(repo, &args)
    }

    /// Blob content, byte for byte (no trimming).
    fn cat_blob(&self, repo: &RepoRef, object: &str) -> Result<String> {
        let output = self.output(repo, self.command(repo, &["cat-file", "blob", object]), None)?;
        if !output.status.success() {
            return Err(Error::GitCommand {
                command: format!("cat-file blob {}", object),
                repo: repo.name.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn describe(command: &Command) -> String {
    command
        .get_args()
        .skip(2)
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ConfigStore for GitCliStore {
    fn get_file(&self, repo: &RepoRef, path: &str) -> Result<Option<String>> {
        if self.resolve_branch(repo, &repo.branch)?.is_none() {
            return Ok(None);
        }
        let object = format!("refs/heads/{}:{}", repo.branch, path);
        let exists = self.output(repo, self.command(repo, &["cat-file", "-e", &object]), None)?;
        if !exists.status.success() {
            return Ok(None);
        }
        self.cat_blob(repo, &object).map(Some)
    }

    fn get_all_files(&self, repo: &RepoRef, root: &str) -> Result<BTreeMap<String, String>> {
        let head = self
            .resolve_branch(repo, &repo.branch)?
            .ok_or_else(|| Error::MissingRef {
                repo: repo.name.clone(),
                reference: repo.branch.clone(),
            })?;
        let root = root.trim_end_matches('/');
        let listing = self.git(repo, &["ls-tree", "-r", "--name-only", &head, "--", root])?;
        let mut files = BTreeMap::new();
        for path in listing.lines().filter(|l| !l.is_empty()) {
            let object = format!("{}:{}", head, path);
            let content = self.cat_blob(repo, &object)?;
            files.insert(path.to_string(), content);
        }
        Ok(files)
    }

    fn write_file(&self, repo: &RepoRef, path: &str, content: &str, message: &str) -> Result<()> {
        let parent = self.resolve_branch(repo, &repo.branch)?;
        let file = FileChange {
            path: path.to_string(),
            content: content.to_string(),
        };
        let commit = self.commit_files(repo, parent.as_deref(), &[file], message)?;
        let reference = format!("refs/heads/{}", repo.branch);
        self.git(repo, &["update-ref", &reference, &commit])?;
        debug!("Committed {} to {} as {}", path, repo, commit);
        Ok(())
    }

    fn get_branch(&self, repo: &RepoRef, branch: &str) -> Result<Option<GitRef>> {
        Ok(self.resolve_branch(repo, branch)?.map(|sha| GitRef {
            name: branch.to_string(),
            sha,
        }))
    }

    fn get_tree(&self, repo: &RepoRef, commit: &str) -> Result<BTreeMap<String, String>> {
        self.ensure_repo(repo)?;
        let listing = self.git(repo, &["ls-tree", "-r", commit])?;
        let mut tree = BTreeMap::new();
        // Format: <mode> SP <type> SP <object> TAB <path>
        for line in listing.lines() {
            let Some((meta, path)) = line.split_once('\t') else {
                continue;
            };
            if let Some(object) = meta.split_whitespace().nth(2) {
                tree.insert(path.to_string(), object.to_string());
            }
        }
        Ok(tree)
    }

    fn hash_blob(&self, repo: &RepoRef, content: &str) -> Result<String> {
        self.ensure_repo(repo)?;
        self.run(
            repo,
            self.command(repo, &["hash-object", "--stdin"]),
            Some(content),
        )
    }

    fn create_commit(
        &self,
        repo: &RepoRef,
        parent: &str,
        files: &[FileChange],
        message: &str,
    ) -> Result<String> {
        self.ensure_repo(repo)?;
        self.commit_files(repo, Some(parent), files, message)
    }

    fn create_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef> {
        self.ensure_repo(repo)?;
        let reference = format!("refs/heads/{}", branch);
        // An empty old value makes update-ref refuse to overwrite an existing ref
        self.git(repo, &["update-ref", &reference, commit, ""])?;
        Ok(GitRef {
            name: branch.to_string(),
            sha: commit.to_string(),
        })
    }

    fn update_branch(&self, repo: &RepoRef, branch: &str, commit: &str) -> Result<GitRef> {
        if self.resolve_branch(repo, branch)?.is_none() {
            return Err(Error::MissingRef {
                repo: repo.name.clone(),
                reference: branch.to_string(),
            });
        }
        let reference = format!("refs/heads/{}", branch);
        self.git(repo, &["update-ref", &reference, commit])?;
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
        self.ensure_repo(repo)?;
        let args = [
            "pr", "create", "--head", branch, "--base", base, "--title", title, "--body", title,
        ];
        let output = Command::new(&self.pull_request_cli)
            .current_dir(self.repo_dir(repo))
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::GitCommand {
                command: format!("{} {}", self.pull_request_cli, args.join(" ")),
                repo: repo.name.clone(),
                stderr: e.to_string(),
            })?;
        if output.status.success() {
            return Ok(true);
        }
        warn!(
            "Pull request for {} in {} was not created: {}",
            branch,
            repo.name,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(false)
    }
}
