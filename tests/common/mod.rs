//! Shared test utilities and fixtures for the confparse test suite.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::PathBuf;

use confparse::prelude::*;

// ============================================================================
// Test Fixture Loading Helpers
// ============================================================================

/// Get the path to the test fixtures directory.
pub fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to a specific fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_path().join(relative_path)
}

/// Load a fixture file as a string.
pub fn load_fixture(relative_path: &str) -> std::io::Result<String> {
    std::fs::read_to_string(fixture_path(relative_path))
}

/// Open a fixture configuration with default options for `dialect`.
pub fn open_fixture(relative_path: &str, dialect: Dialect) -> ConfigDocument {
    open_fixture_with(relative_path, ParseOptions::new(dialect))
}

/// Open a fixture configuration with explicit options.
pub fn open_fixture_with(relative_path: &str, options: ParseOptions) -> ConfigDocument {
    ConfigDocument::open(fixture_path(relative_path), options)
        .unwrap_or_else(|e| panic!("Failed to open fixture {}: {}", relative_path, e))
}

/// Parse an inline configuration given as lines.
pub fn doc_from_lines(dialect: Dialect, lines: &[&str]) -> ConfigDocument {
    ConfigDocument::parse_lines(lines, ParseOptions::new(dialect)).expect("parse failed")
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Text of each node in `ids`, in order.
pub fn texts(doc: &ConfigDocument, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .map(|id| doc.tree().node(*id).expect("unknown node").text().to_string())
        .collect()
}

/// Text of the parent of `id`, if it has one.
pub fn parent_text(doc: &ConfigDocument, id: NodeId) -> Option<String> {
    doc.tree()
        .parent(id)
        .map(|p| doc.tree().node(p).expect("unknown parent").text().to_string())
}

/// Id of the first node whose text equals `text` exactly.
pub fn id_of(doc: &ConfigDocument, text: &str) -> NodeId {
    doc.tree()
        .iter()
        .find(|(_, node)| node.text() == text)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no line '{}'", text))
}

/// Assert the structural invariants every committed tree must hold.
pub fn assert_tree_invariants(tree: &ConfigTree) {
    let mut previous_line = None;
    for (id, node) in tree.iter() {
        if let Some(prev) = previous_line {
            assert!(
                node.line_number() > prev,
                "line numbers not increasing at {}",
                id
            );
        }
        previous_line = Some(node.line_number());

        if let Some(parent) = node.parent() {
            let siblings = tree.children(parent);
            assert_eq!(
                siblings.iter().filter(|c| **c == id).count(),
                1,
                "{} not listed exactly once under its parent",
                id
            );
        }
        for child in node.children() {
            assert_eq!(tree.parent(*child), Some(id), "child {} of {} disagrees", child, id);
        }
    }
}
