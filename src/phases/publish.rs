//! Publish Workflow
//!
//! Publishes generated manifests to the destination repository through a
//! feature branch and a pull request, writing nothing when the published
//! state already matches.
//!
//! ## Process
//!
//! 1.  **Resolve** `features/{team}` (or `features/{team}-{service}`).
//!
//! 2.  **Render** every file to YAML and restore the `$imagepolicy` comment
//!     markers the serializer quoted.
//!
//! 3.  **Diff** each file's blob id against the base tree: the branch tip
//!     when the branch exists, the default branch otherwise. Blob ids are
//!     computed locally, so an unchanged run performs no writes at all.
//!
//! 4.  **Publish** the delta. Without a branch, the commit goes on top of
//!     the default branch, the branch is created at it and a pull request
//!     is opened. With a branch, the commit goes on its tip and the branch
//!     is moved forward; the open pull request picks it up.

use std::fmt;

use log::{debug, info, warn};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::defaults::FEATURE_BRANCH_PREFIX;
use crate::error::{Error, Result};
use crate::files::GeneratedFiles;
use crate::node;
use crate::store::{ConfigStore, FileChange, GitRef, RepoRef};

/// What a publish run did to the destination repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PublishOutcome {
    /// Generation stopped before publishing
    NotAttempted,
    /// Every file already matched the base tree
    NoChanges,
    /// A new branch was created and a pull request requested
    PullRequestCreated { branch: String, commit: String },
    /// An existing branch was moved to a new commit
    BranchUpdated { branch: String, commit: String },
}

impl PublishOutcome {
    /// Whether the run wrote anything to the destination.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            PublishOutcome::PullRequestCreated { .. } | PublishOutcome::BranchUpdated { .. }
        )
    }
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::NotAttempted => write!(f, "not published"),
            PublishOutcome::NoChanges => write!(f, "no changes"),
            PublishOutcome::PullRequestCreated { branch, commit } => {
                write!(f, "pull request opened from {} at {}", branch, commit)
            }
            PublishOutcome::BranchUpdated { branch, commit } => {
                write!(f, "branch {} updated to {}", branch, commit)
            }
        }
    }
}

/// Feature branch manifests for `team` (and optionally one service) go to.
pub fn feature_branch(team: &str, service: Option<&str>) -> String {
    match service {
        Some(service) => format!("{}/{}-{}", FEATURE_BRANCH_PREFIX, team, service),
        None => format!("{}/{}", FEATURE_BRANCH_PREFIX, team),
    }
}

/// Pull request title, e.g. `FFC-DEMO Manifest`.
pub fn pull_request_title(team: &str, service: Option<&str>) -> String {
    format!("{} Manifest", service.unwrap_or(team).to_uppercase())
}

const SINGLE_QUOTED_MARKER: &str = r#"'([^'\n]*?) # \{"\$imagepolicy": "([^"\n]*)"\}'"#;
const DOUBLE_QUOTED_MARKER: &str = r#""([^"\n]*?) # \{\\"\$imagepolicy\\": \\"([^"\\\n]*)\\"\}""#;

/// Unquote `'<value> # {"$imagepolicy": "<policy>"}'` scalars so the marker
/// is a YAML comment again, as the image-automation controller expects.
pub fn restore_image_policy_markers(yaml: &str) -> Result<String> {
    let marker = |caps: &Captures| format!(r#"{} # {{"$imagepolicy": "{}"}}"#, &caps[1], &caps[2]);
    let restored = Regex::new(SINGLE_QUOTED_MARKER)?.replace_all(yaml, marker);
    Ok(Regex::new(DOUBLE_QUOTED_MARKER)?
        .replace_all(&restored, marker)
        .into_owned())
}

/// Render every generated file to its published text.
pub fn render_files(files: &GeneratedFiles) -> Result<Vec<FileChange>> {
    files
        .iter()
        .map(|(path, tree)| {
            Ok(FileChange {
                path: path.clone(),
                content: restore_image_policy_markers(&node::render(tree)?)?,
            })
        })
        .collect()
}

/// The subset of `files` whose blob differs from the tree of `base`.
pub fn changed_files(
    store: &dyn ConfigStore,
    repo: &RepoRef,
    base: &GitRef,
    files: &[FileChange],
) -> Result<Vec<FileChange>> {
    let tree = store.get_tree(repo, &base.sha)?;
    let mut changed = Vec::new();
    for file in files {
        let blob = store.hash_blob(repo, &file.content)?;
        if tree.get(&file.path) != Some(&blob) {
            debug!("{} differs from {}", file.path, base.name);
            changed.push(file.clone());
        }
    }
    Ok(changed)
}

fn resolve_base(store: &dyn ConfigStore, repo: &RepoRef, base_branch: Option<&str>) -> Result<GitRef> {
    if let Some(tip) = store.get_branch(repo, &repo.branch)? {
        return Ok(tip);
    }
    let fallback = base_branch.unwrap_or(&repo.branch);
    store.get_branch(repo, fallback)?.ok_or_else(|| Error::MissingRef {
        repo: repo.name.clone(),
        reference: fallback.to_string(),
    })
}

/// Commit the files that differ from `repo.branch` (or from `base_branch`
/// when that branch does not exist yet).
///
/// Returns `None`, without writing anything, when nothing differs.
pub fn create_commit(
    store: &dyn ConfigStore,
    repo: &RepoRef,
    files: &[FileChange],
    message: &str,
    base_branch: Option<&str>,
) -> Result<Option<String>> {
    let base = resolve_base(store, repo, base_branch)?;
    let changed = changed_files(store, repo, &base, files)?;
    if changed.is_empty() {
        return Ok(None);
    }
    info!("Committing {} changed files onto {}", changed.len(), base.name);
    store
        .create_commit(repo, &base.sha, &changed, message)
        .map(Some)
}

/// Execute the publish workflow for `files` on `branch`.
///
/// `destination` points at the default branch of the manifests repository.
/// A pull request the host refuses is reported in `errors`; every other
/// failure is returned.
pub fn execute(
    store: &dyn ConfigStore,
    destination: &RepoRef,
    branch: &str,
    title: &str,
    files: &GeneratedFiles,
    errors: &mut Vec<String>,
) -> Result<PublishOutcome> {
    let feature = RepoRef::new(destination.name.clone(), branch);
    let existing = store.get_branch(destination, branch)?;
    let rendered = render_files(files)?;

    let Some(commit) = create_commit(store, &feature, &rendered, title, Some(&destination.branch))? else {
        info!("{} is up to date", branch);
        return Ok(PublishOutcome::NoChanges);
    };

    match existing {
        None => {
            store.create_branch(destination, branch, &commit)?;
            if !store.create_pull_request(destination, branch, &destination.branch, title)? {
                warn!("Pull request for {} was not created", branch);
                errors.push(format!(
                    "Failed to create pull request '{}' from {} into {}",
                    title, branch, destination.branch
                ));
            }
            Ok(PublishOutcome::PullRequestCreated {
                branch: branch.to_string(),
                commit,
            })
        }
        Some(_) => {
            store.update_branch(destination, branch, &commit)?;
            Ok(PublishOutcome::BranchUpdated {
                branch: branch.to_string(),
                commit,
            })
        }
    }
}
