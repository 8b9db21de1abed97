//! # Template Store
//!
//! This module provides the `TemplateStore`, which lists every file under
//! `flux/templates/` in the templates repository and parses it into a
//! [`TemplateNode`].
//!
//! ## Design
//!
//! The store sits on top of two injected collaborators:
//!
//! - **`ConfigStore`**: reads the raw files from the Git host.
//! - **`KeyValueCache`**: holds the parsed tree, keyed by `repo@branch`.
//!
//! A cache miss fetches the whole template directory in one go. Entries are
//! never invalidated early; they expire at the next UTC midnight, so a
//! template change is picked up on the first run of the following day. Both
//! collaborators can be replaced in tests.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use log::{debug, info};

use crate::cache::{KeyValueCache, MidnightCache};
use crate::defaults::TEMPLATES_ROOT;
use crate::error::Result;
use crate::node::{self, TemplateNode};
use crate::path::relative_to;
use crate::store::{ConfigStore, RepoRef};

/// Parsed templates keyed by path relative to `flux/templates/`.
pub type TemplateTree = BTreeMap<String, TemplateNode>;

/// Cached access to the template library.
#[derive(Clone)]
pub struct TemplateStore {
    store: Arc<dyn ConfigStore>,
    cache: Arc<dyn KeyValueCache<TemplateTree>>,
    repo: RepoRef,
}

impl TemplateStore {
    /// Creates a store with a fresh process-local cache.
    pub fn new(store: Arc<dyn ConfigStore>, repo: RepoRef) -> Self {
        Self::with_cache(store, Arc::new(MidnightCache::new()), repo)
    }

    /// Creates a store on the cache shared by the whole process.
    pub fn process_wide(store: Arc<dyn ConfigStore>, repo: RepoRef) -> Self {
        static SHARED: OnceLock<Arc<MidnightCache<TemplateTree>>> = OnceLock::new();
        let cache = SHARED.get_or_init(|| Arc::new(MidnightCache::new())).clone();
        Self::with_cache(store, cache, repo)
    }

    /// Creates a store that shares `cache` with other stores.
    pub fn with_cache(
        store: Arc<dyn ConfigStore>,
        cache: Arc<dyn KeyValueCache<TemplateTree>>,
        repo: RepoRef,
    ) -> Self {
        Self { store, cache, repo }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// All templates, from the cache when a live entry exists.
    pub fn get_templates(&self) -> Result<TemplateTree> {
        let key = self.repo.to_string();
        if let Some(tree) = self.cache.get(&key)? {
            debug!("Template cache hit for {}", key);
            return Ok(tree);
        }

        let files = self.store.get_all_files(&self.repo, TEMPLATES_ROOT)?;
        let mut tree = TemplateTree::new();
        for (path, content) in &files {
            let Some(relative) = relative_to(path, TEMPLATES_ROOT) else {
                continue;
            };
            tree.insert(relative.to_string(), node::parse(relative, content)?);
        }
        info!("Loaded {} templates from {}", tree.len(), key);

        self.cache.set(&key, tree.clone())?;
        Ok(tree)
    }
}
