//! Fuzz target for the brace normalizer.
//!
//! Arbitrary text must either normalize or fail with a parse error, and
//! rendering the result back into braces must not panic either.

#![no_main]

use arbitrary::Arbitrary;
use confparse::brace::BraceNormalizer;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    text: String,
    indent_step: u8,
    hash_comments: bool,
}

fuzz_target!(|input: FuzzInput| {
    let markers = if input.hash_comments { vec!['#'] } else { vec!['!'] };
    let step = usize::from(input.indent_step % 8) + 1;
    let Ok(normalizer) = BraceNormalizer::new(markers, step) else {
        return;
    };

    if let Ok(lines) = normalizer.normalize(&input.text) {
        for (idx, line) in lines.iter().enumerate() {
            assert_eq!(line.line_number, idx);
            assert_eq!(line.indent % step, 0);
        }
        let rendered = normalizer.render_braces(&lines).join("\n");
        let _ = normalizer.normalize(&rendered);
    }
});
