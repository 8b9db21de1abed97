//! Token substitution over template trees.
//!
//! A token is a [`FluxConfig`] key/value pair. Every string scalar in a tree
//! has each occurrence of `__KEY__` replaced with the token's value. Tokens
//! are applied one full walk at a time, in the order given, so a replacement
//! value that itself contains `__OTHER__` is only resolved when `OTHER` comes
//! later in the list. Nothing is rescanned after the last token.

use crate::config::FluxConfig;
use crate::node::{Scalar, TemplateNode};

/// The placeholder text for `key`.
pub fn placeholder(key: &str) -> String {
    format!("__{}__", key)
}

/// Apply a single token to every string scalar in `node`.
///
/// Mapping keys and non-string scalars are left untouched.
pub fn substitute(node: &mut TemplateNode, token: &FluxConfig) {
    let pattern = placeholder(&token.key);
    replace_in(node, &pattern, &token.value);
}

fn replace_in(node: &mut TemplateNode, pattern: &str, value: &str) {
    match node {
        TemplateNode::Scalar(Scalar::String(text)) => {
            if text.contains(pattern) {
                *text = text.replace(pattern, value);
            }
        }
        TemplateNode::Scalar(_) => {}
        TemplateNode::Sequence(items) => {
            for item in items {
                replace_in(item, pattern, value);
            }
        }
        TemplateNode::Mapping(map) => {
            for child in map.values_mut() {
                replace_in(child, pattern, value);
            }
        }
    }
}

/// Apply `tokens` to `node` in order.
pub fn substitute_all<'a, I>(node: &mut TemplateNode, tokens: I)
where
    I: IntoIterator<Item = &'a FluxConfig>,
{
    for token in tokens {
        substitute(node, token);
    }
}
