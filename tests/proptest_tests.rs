//! Property-based tests for confparse using proptest.
//!
//! Configurations are generated from a small grammar of indented statements
//! so that every generated input is structurally meaningful.

mod common;

use common::assert_tree_invariants;
use confparse::brace::{normalize, BraceNormalizer, NormalizedLine};
use confparse::prelude::*;
use proptest::collection::vec;
use proptest::prelude::*;

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Strategy for a statement word; block openers are excluded so that
/// nesting always follows indentation
fn word() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,8}")
        .unwrap()
        .prop_filter("block opener", |w| {
            !matches!(w.as_str(), "banner" | "macro" | "set" | "aaa")
        })
}

/// Strategy for one indented IOS-style line
fn ios_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0usize..4, vec(word(), 1..4)).prop_map(|(depth, words)| {
            format!("{}{}", " ".repeat(depth), words.join(" "))
        }),
        1 => (0usize..3).prop_map(|depth| format!("{}!", " ".repeat(depth))),
        1 => Just(String::new()),
    ]
}

/// Strategy for a whole IOS-style configuration
fn ios_config() -> impl Strategy<Value = Vec<String>> {
    vec(ios_line(), 0..40)
}

/// Strategy for a nested brace block rendered on one or many lines
fn brace_block() -> impl Strategy<Value = String> {
    let leaf = word().prop_map(|w| format!("{};", w));
    leaf.prop_recursive(4, 32, 4, |inner| {
        (word(), vec(inner, 0..4), any::<bool>()).prop_map(|(header, body, multiline)| {
            if multiline {
                format!("{} {{\n{}\n}}", header, body.join("\n"))
            } else {
                format!("{} {{ {} }}", header, body.join(" "))
            }
        })
    })
}

fn parse(lines: &[String]) -> ConfigDocument {
    ConfigDocument::parse_lines(lines, ParseOptions::new(Dialect::Ios)).unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_bootstrap_is_deterministic(lines in ios_config()) {
        let first = parse(&lines);
        let second = parse(&lines);
        prop_assert_eq!(first.objects(), second.objects());
        prop_assert_eq!(first.tree().checkpoint(), second.tree().checkpoint());
    }

    #[test]
    fn prop_tree_invariants_hold(lines in ios_config()) {
        let doc = parse(&lines);
        assert_tree_invariants(doc.tree());
        for (id, node) in doc.tree().iter() {
            if let Some(parent) = node.parent() {
                let parent_node = doc.tree().node(parent).unwrap();
                prop_assert!(parent_node.indent() < node.indent(), "{} indented under {}", id, parent);
                prop_assert!(!parent_node.is_comment());
            }
        }
    }

    #[test]
    fn prop_branch_length_matches_patterns(
        lines in ios_config(),
        patterns in vec("[a-z]", 2..5),
        empty in any::<bool>(),
    ) {
        let doc = parse(&lines);
        let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
        let branches = doc
            .find_object_branches(&patterns, &BranchOptions::new().with_empty_branches(empty))
            .unwrap();
        for branch in &branches {
            prop_assert_eq!(branch.len(), patterns.len());
            if !empty {
                prop_assert!(branch.is_complete());
            }
        }
    }

    #[test]
    fn prop_checkpoint_tracks_edits(lines in ios_config(), extra in word()) {
        let mut doc = ConfigDocument::parse_lines(
            &lines,
            ParseOptions::new(Dialect::Ios).with_auto_commit(false),
        )
        .unwrap();
        let committed = doc.tree().commit_checkpoint();
        prop_assert_eq!(doc.tree().checkpoint(), committed);

        doc.append(&extra).unwrap();
        prop_assert_ne!(doc.tree().checkpoint(), committed);
        prop_assert!(!doc.search_safe());

        doc.commit();
        prop_assert!(doc.search_safe());
        prop_assert_eq!(doc.tree().checkpoint(), doc.tree().commit_checkpoint());
    }

    #[test]
    fn prop_brace_round_trip(blocks in vec(brace_block(), 1..5)) {
        let text = blocks.join("\n");
        let normalizer = BraceNormalizer::new(vec!['#'], 4).unwrap();
        let first = normalizer.normalize(&text).unwrap();
        let rendered = normalizer.render_braces(&first).join("\n");
        let second = normalizer.normalize(&rendered).unwrap();
        prop_assert_eq!(&first, &second);

        let lines: Vec<String> = first.iter().map(NormalizedLine::rendered).collect();
        let doc = ConfigDocument::parse(&text, ParseOptions::new(Dialect::Junos)).unwrap();
        prop_assert_eq!(doc.get_text(), lines);
    }

    #[test]
    fn prop_normalizer_never_panics(text in "[a-z {};#\n]{0,80}") {
        let _ = normalize(&text, &['#'], 4);
    }
}
