//! Property-based tests for token substitution and path templating.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::config::FluxConfig;
    use crate::node::{Mapping, TemplateNode};
    use crate::path::environment_path;
    use crate::tokens::{placeholder, substitute};
    use proptest::prelude::*;

    fn arb_text() -> impl Strategy<Value = String> {
        "[a-z0-9 ./:-]{0,12}"
    }

    /// Scalars that may embed `__KEY__` any number of times.
    fn arb_scalar() -> impl Strategy<Value = TemplateNode> {
        prop::collection::vec((arb_text(), any::<bool>()), 0..5).prop_map(|parts| {
            let mut text = String::new();
            for (part, with_token) in parts {
                text.push_str(&part);
                if with_token {
                    text.push_str("__KEY__");
                }
            }
            TemplateNode::string(text)
        })
    }

    fn arb_node() -> impl Strategy<Value = TemplateNode> {
        arb_scalar().prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(TemplateNode::Sequence),
                prop::collection::vec(("[a-z]{1,8}", inner), 0..6).prop_map(|entries| {
                    TemplateNode::Mapping(entries.into_iter().collect::<Mapping>())
                }),
            ]
        })
    }

    fn count_in(node: &TemplateNode, needle: &str) -> usize {
        match node {
            TemplateNode::Scalar(_) => node.as_str().map_or(0, |s| s.matches(needle).count()),
            TemplateNode::Sequence(items) => items.iter().map(|i| count_in(i, needle)).sum(),
            TemplateNode::Mapping(map) => map.iter().map(|(_, v)| count_in(v, needle)).sum(),
        }
    }

    // ============================================================================
    // token substitution property tests
    // ============================================================================

    proptest! {
        /// Property: after substitution no `__KEY__` remains anywhere in the tree
        #[test]
        fn substitution_leaves_no_placeholder(mut node in arb_node(), value in "[A-Z0-9.-]{1,10}") {
            substitute(&mut node, &FluxConfig::new("KEY", &value));
            prop_assert_eq!(count_in(&node, &placeholder("KEY")), 0);
        }

        /// Property: every placeholder is replaced by exactly one copy of the value
        #[test]
        fn substitution_replaces_every_occurrence(node in arb_node()) {
            let before = count_in(&node, "__KEY__");
            let mut after = node.clone();
            substitute(&mut after, &FluxConfig::new("KEY", "@"));
            prop_assert_eq!(count_in(&after, "@"), before);
        }

        /// Property: substituting a token that never occurs changes nothing
        #[test]
        fn substitution_of_absent_token_is_identity(node in arb_node()) {
            let mut after = node.clone();
            substitute(&mut after, &FluxConfig::new("ABSENT", "x"));
            prop_assert_eq!(after, node);
        }
    }

    // ============================================================================
    // environment path property tests
    // ============================================================================

    proptest! {
        /// Property: family and zero-prefixed instance are split on the third character
        #[test]
        fn environment_path_splits_family_and_instance(family in "[a-z]{3}", instance in 1u32..1000) {
            let name = format!("{}{}", family, instance);
            prop_assert_eq!(environment_path(&name), format!("{}/0{}", family, instance));
        }

        /// Property: the environment path always contains exactly one separator
        #[test]
        fn environment_path_has_one_separator(name in "[a-z]{3}[0-9]{1,3}") {
            prop_assert_eq!(environment_path(&name).matches('/').count(), 1);
        }
    }
}
