//! # Generic YAML Tree
//!
//! Every template file and every generated manifest is held as a
//! [`TemplateNode`]: a tagged variant over scalars, sequences and mappings.
//! Structural edits walk the tree with exhaustive matches, and shape
//! mismatches surface as a [`ShapeError`] that the caller turns into a fatal
//! [`Error::Template`].
//!
//! Conversion to and from `serde_yaml::Value` happens only at the edges
//! ([`parse`] and [`render`]); copies are plain `Clone`s of the tree.

use std::fmt;

use serde_yaml::{Number, Value};

use crate::error::{Error, Result};

/// A YAML scalar. String scalars are the only ones token substitution touches.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// A node of a template or generated manifest tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Scalar(Scalar),
    Sequence(Vec<TemplateNode>),
    Mapping(Mapping),
}

/// String-keyed map that keeps insertion order for rendering.
///
/// Equality ignores order: two mappings are equal when they hold the same
/// keys bound to equal values.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: Vec<(String, TemplateNode)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&TemplateNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TemplateNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: TemplateNode) -> Option<TemplateNode> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// The value under `key`, inserting `default()` at the end when absent.
    pub fn get_or_insert_with(
        &mut self,
        key: &str,
        default: impl FnOnce() -> TemplateNode,
    ) -> &mut TemplateNode {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn remove(&mut self, key: &str) -> Option<TemplateNode> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateNode)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut TemplateNode> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, TemplateNode)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, TemplateNode)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

/// A structural edit found the wrong kind of node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// Dotted key path of the offending node, empty for the document root
    pub location: String,
    pub expected: &'static str,
    pub found: &'static str,
}

impl ShapeError {
    /// Attach the template path and turn this into a fatal template error.
    pub fn into_error(self, path: &str) -> Error {
        Error::template(path, self.to_string())
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.location.is_empty() {
            "<root>"
        } else {
            &self.location
        };
        write!(
            f,
            "'{}' is a {}, expected a {}",
            location, self.found, self.expected
        )
    }
}

impl TemplateNode {
    pub fn string(value: impl Into<String>) -> Self {
        TemplateNode::Scalar(Scalar::String(value.into()))
    }

    pub fn null() -> Self {
        TemplateNode::Scalar(Scalar::Null)
    }

    /// Human-readable kind name, used in structural error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TemplateNode::Scalar(Scalar::Null) => "Null",
            TemplateNode::Scalar(Scalar::Bool(_)) => "Bool",
            TemplateNode::Scalar(Scalar::Number(_)) => "Number",
            TemplateNode::Scalar(Scalar::String(_)) => "String",
            TemplateNode::Sequence(_) => "Sequence",
            TemplateNode::Mapping(_) => "Mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateNode::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<TemplateNode>> {
        match self {
            TemplateNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            TemplateNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&TemplateNode> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Walk `keys` through nested mappings.
    ///
    /// Returns `Ok(None)` when a key is missing and a [`ShapeError`] when a
    /// node on the way is not a mapping.
    pub fn get_path_mut(
        &mut self,
        keys: &[&str],
    ) -> std::result::Result<Option<&mut TemplateNode>, ShapeError> {
        let mut current = self;
        let mut walked: Vec<&str> = Vec::with_capacity(keys.len());
        for key in keys {
            let map = match current {
                TemplateNode::Mapping(map) => map,
                other => {
                    return Err(ShapeError {
                        location: walked.join("."),
                        expected: "Mapping",
                        found: other.kind_name(),
                    })
                }
            };
            match map.get_mut(key) {
                Some(next) => current = next,
                None => return Ok(None),
            }
            walked.push(*key);
        }
        Ok(Some(current))
    }

    /// The mapping at `keys`, or `Ok(None)` when any key is missing.
    pub fn mapping_at_mut(
        &mut self,
        keys: &[&str],
    ) -> std::result::Result<Option<&mut Mapping>, ShapeError> {
        match self.get_path_mut(keys)? {
            None => Ok(None),
            Some(TemplateNode::Mapping(map)) => Ok(Some(map)),
            Some(other) => Err(ShapeError {
                location: keys.join("."),
                expected: "Mapping",
                found: other.kind_name(),
            }),
        }
    }

    /// The sequence stored under `key` of this mapping, created empty when
    /// the key is absent.
    pub fn sequence_entry_mut(
        &mut self,
        key: &str,
    ) -> std::result::Result<&mut Vec<TemplateNode>, ShapeError> {
        let map = match self {
            TemplateNode::Mapping(map) => map,
            other => {
                return Err(ShapeError {
                    location: String::new(),
                    expected: "Mapping",
                    found: other.kind_name(),
                })
            }
        };
        match map.get_or_insert_with(key, || TemplateNode::Sequence(Vec::new())) {
            TemplateNode::Sequence(items) => Ok(items),
            other => Err(ShapeError {
                location: key.to_string(),
                expected: "Sequence",
                found: other.kind_name(),
            }),
        }
    }
}

impl From<&str> for TemplateNode {
    fn from(value: &str) -> Self {
        TemplateNode::string(value)
    }
}

impl TryFrom<Value> for TemplateNode {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => TemplateNode::Scalar(Scalar::Null),
            Value::Bool(b) => TemplateNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => TemplateNode::Scalar(Scalar::Number(n)),
            Value::String(s) => TemplateNode::Scalar(Scalar::String(s)),
            Value::Sequence(items) => TemplateNode::Sequence(
                items
                    .into_iter()
                    .map(TemplateNode::try_from)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut mapping = Mapping::new();
                for (key, value) in map {
                    mapping.insert(scalar_key(key)?, TemplateNode::try_from(value)?);
                }
                TemplateNode::Mapping(mapping)
            }
            Value::Tagged(tagged) => TemplateNode::try_from(tagged.value)?,
        })
    }
}

fn scalar_key(key: Value) -> std::result::Result<String, String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(format!("unsupported mapping key: {:?}", other)),
    }
}

impl From<&TemplateNode> for Value {
    fn from(node: &TemplateNode) -> Self {
        match node {
            TemplateNode::Scalar(Scalar::Null) => Value::Null,
            TemplateNode::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            TemplateNode::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            TemplateNode::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            TemplateNode::Sequence(items) => {
                Value::Sequence(items.iter().map(Value::from).collect())
            }
            TemplateNode::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (Value::String(k.clone()), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Parse YAML text into a tree. `path` is only used for error messages.
pub fn parse(path: &str, content: &str) -> Result<TemplateNode> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| Error::template(path, format!("invalid YAML: {}", e)))?;
    TemplateNode::try_from(value).map_err(|message| Error::template(path, message))
}

/// Render a tree back to YAML text.
pub fn render(node: &TemplateNode) -> Result<String> {
    Ok(serde_yaml::to_string(&Value::from(node))?)
}
