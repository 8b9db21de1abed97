//! In-memory set of generated manifests

use std::collections::btree_map::{self, BTreeMap};

use crate::config::FluxConfig;
use crate::node::TemplateNode;
use crate::tokens;

/// Generated manifests keyed by repository path.
///
/// Paths are kept sorted so rendering and publishing are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedFiles {
    files: BTreeMap<String, TemplateNode>,
}

impl GeneratedFiles {
    /// Create an empty file set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file unless `path` is already present (first write wins).
    ///
    /// Returns false when the file was skipped.
    pub fn insert_if_absent(&mut self, path: impl Into<String>, node: TemplateNode) -> bool {
        match self.files.entry(path.into()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(node);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, node: TemplateNode) -> Option<TemplateNode> {
        self.files.insert(path.into(), node)
    }

    pub fn get(&self, path: &str) -> Option<&TemplateNode> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut TemplateNode> {
        self.files.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all paths in sorted order
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Move every file of `other` into this set, keeping existing entries.
    pub fn absorb(&mut self, other: GeneratedFiles) {
        for (path, node) in other.files {
            self.insert_if_absent(path, node);
        }
    }

    /// Apply `tokens` in order to every file.
    pub fn substitute_all(&mut self, tokens: &[FluxConfig]) {
        for node in self.files.values_mut() {
            tokens::substitute_all(node, tokens);
        }
    }

    /// Iterate over all files as (path, node) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateNode)> {
        self.files.iter()
    }
}
