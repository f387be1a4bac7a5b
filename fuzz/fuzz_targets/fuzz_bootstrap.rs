//! Fuzz target for hierarchy construction across every dialect.

#![no_main]

use arbitrary::Arbitrary;
use confparse::prelude::*;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    dialect: u8,
    ignore_blank_lines: bool,
    lines: Vec<String>,
}

fuzz_target!(|input: FuzzInput| {
    let dialect = Dialect::ALL[usize::from(input.dialect) % Dialect::ALL.len()];
    let options = ParseOptions::new(dialect).with_ignore_blank_lines(input.ignore_blank_lines);
    let Ok(doc) = ConfigDocument::parse_lines(&input.lines, options) else {
        return;
    };

    for (id, node) in doc.tree().iter() {
        if let Some(parent) = node.parent() {
            assert!(doc.tree().children(parent).contains(&id));
        }
    }
    let _ = doc.find_object_branches(&["a", "b"], &BranchOptions::new().with_empty_branches(true));
});
