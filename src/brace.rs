//! Brace-to-indent normalization.
//!
//! Brace-delimited dialects (Junos, F5, Palo Alto) are rewritten into
//! indentation-equivalent lines so the indentation-based tree builder can be
//! reused unchanged:
//!
//! ```text
//! system {                 system
//!     host-name r1;   =>       host-name r1
//!     services { ssh; }        services
//! }                                ssh
//! ```
//!
//! `{` and `}` are the only structural delimiters. A leaf is the text found
//! on one physical line between delimiters; a trailing `;` is dropped and
//! empty leaves vanish. Comment lines are copied through untouched.

use crate::error::{Error, Result};
use tracing::{debug, error};

/// One output line of the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Indentation width, `depth * indent_step`
    pub indent: usize,
    /// Position in flattening order
    pub line_number: usize,
    /// Statement text without indentation
    pub text: String,
}

impl NormalizedLine {
    /// The line as it is fed to the tree builder.
    pub fn rendered(&self) -> String {
        format!("{}{}", " ".repeat(self.indent), self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// `opens` is false for comments and `;`-terminated statements, which
    /// cannot head a block.
    Leaf {
        text: String,
        line: usize,
        opens: bool,
    },
    Open { line: usize },
    Close { line: usize },
}

#[derive(Debug)]
struct Block {
    text: String,
    children: Vec<Block>,
}

/// Rewrites brace-delimited text into indented lines.
#[derive(Debug, Clone)]
pub struct BraceNormalizer {
    comment_markers: Vec<char>,
    indent_step: usize,
}

impl BraceNormalizer {
    pub fn new(comment_markers: Vec<char>, indent_step: usize) -> Result<Self> {
        if indent_step == 0 {
            return Err(Error::invalid_arguments("indent step must be at least 1"));
        }
        if comment_markers.iter().any(|c| *c == '{' || *c == '}') {
            return Err(Error::invalid_arguments(
                "a brace cannot be used as a comment marker",
            ));
        }
        Ok(Self {
            comment_markers,
            indent_step,
        })
    }

    pub fn indent_step(&self) -> usize {
        self.indent_step
    }

    fn is_comment(&self, trimmed: &str) -> bool {
        trimmed
            .chars()
            .next()
            .map(|c| self.comment_markers.contains(&c))
            .unwrap_or(false)
    }

    fn tokenize<I, S>(&self, lines: I) -> Vec<Token>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        for (line, raw) in lines.into_iter().enumerate() {
            let trimmed = raw.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if self.is_comment(trimmed) {
                tokens.push(Token::Leaf {
                    text: trimmed.to_string(),
                    line,
                    opens: false,
                });
                continue;
            }

            let mut buffer = String::new();
            for c in trimmed.chars() {
                match c {
                    '{' | '}' => {
                        push_leaf(&mut tokens, &mut buffer, line);
                        tokens.push(if c == '{' {
                            Token::Open { line }
                        } else {
                            Token::Close { line }
                        });
                    }
                    _ => buffer.push(c),
                }
            }
            push_leaf(&mut tokens, &mut buffer, line);
        }
        tokens
    }

    fn build(&self, tokens: Vec<Token>) -> Result<Vec<Block>> {
        let mut roots: Vec<Block> = Vec::new();
        // Blocks whose opening brace is not yet closed, innermost last.
        let mut open: Vec<(Block, usize)> = Vec::new();
        // Set while the last token is a leaf that may head a block.
        let mut header_pending = false;

        for token in tokens {
            match token {
                Token::Leaf { text, opens, .. } => {
                    let level = match open.last_mut() {
                        Some((block, _)) => &mut block.children,
                        None => &mut roots,
                    };
                    level.push(Block {
                        text,
                        children: Vec::new(),
                    });
                    header_pending = opens;
                }
                Token::Open { line } => {
                    let level = match open.last_mut() {
                        Some((block, _)) => &mut block.children,
                        None => &mut roots,
                    };
                    let header = if header_pending { level.pop() } else { None };
                    let Some(header) = header else {
                        error!(line, "opening brace without a statement");
                        return Err(Error::parse_failure(
                            line,
                            "opening brace without an open statement before it",
                        ));
                    };
                    open.push((header, line));
                    header_pending = false;
                }
                Token::Close { line } => {
                    let Some((block, _)) = open.pop() else {
                        error!(line, "unbalanced closing brace");
                        return Err(Error::parse_failure(line, "unbalanced closing brace"));
                    };
                    match open.last_mut() {
                        Some((parent, _)) => parent.children.push(block),
                        None => roots.push(block),
                    }
                    header_pending = false;
                }
            }
        }

        if let Some((block, line)) = open.last() {
            error!(line = *line, statement = %block.text, "unclosed brace");
            return Err(Error::parse_failure(
                *line,
                format!("unclosed brace after '{}'", block.text),
            ));
        }
        Ok(roots)
    }

    /// Normalize brace-delimited `text` into ordered indented lines.
    pub fn normalize(&self, text: &str) -> Result<Vec<NormalizedLine>> {
        self.normalize_lines(text.lines())
    }

    /// Like [`normalize`](Self::normalize), for input that is already split.
    ///
    /// Error line numbers refer to positions in `lines`.
    pub fn normalize_lines<I, S>(&self, lines: I) -> Result<Vec<NormalizedLine>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = self.tokenize(lines);
        if let Some(Token::Open { line } | Token::Close { line }) = tokens.first() {
            error!(line = *line, "input starts with a bare brace");
            return Err(Error::parse_failure(*line, "input starts with a bare brace"));
        }

        let roots = self.build(tokens)?;
        let mut out = Vec::new();
        for block in &roots {
            self.flatten(block, 0, &mut out);
        }
        debug!(lines = out.len(), "normalized brace-delimited configuration");
        Ok(out)
    }

    fn flatten(&self, block: &Block, depth: usize, out: &mut Vec<NormalizedLine>) {
        out.push(NormalizedLine {
            indent: depth * self.indent_step,
            line_number: out.len(),
            text: block.text.clone(),
        });
        for child in &block.children {
            self.flatten(child, depth + 1, out);
        }
    }

    /// Render normalized lines back into brace-delimited text.
    ///
    /// Lines that own deeper lines open a block; other statements end in `;`.
    pub fn render_braces(&self, lines: &[NormalizedLine]) -> Vec<String> {
        let mut out = Vec::with_capacity(lines.len() * 2);
        let mut open_depths: Vec<usize> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            while open_depths.last().is_some_and(|d| *d >= line.indent) {
                let depth = open_depths.pop().unwrap_or_default();
                out.push(format!("{}}}", " ".repeat(depth)));
            }
            let pad = " ".repeat(line.indent);
            let opens = lines
                .get(idx + 1)
                .is_some_and(|next| next.indent > line.indent);
            if opens {
                out.push(format!("{}{} {{", pad, line.text));
                open_depths.push(line.indent);
            } else if self.is_comment(&line.text) {
                out.push(format!("{}{}", pad, line.text));
            } else {
                out.push(format!("{}{};", pad, line.text));
            }
        }
        while let Some(depth) = open_depths.pop() {
            out.push(format!("{}}}", " ".repeat(depth)));
        }
        out
    }
}

fn push_leaf(tokens: &mut Vec<Token>, buffer: &mut String, line: usize) {
    let text = buffer.trim();
    let (text, terminated) = match text.strip_suffix(';') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (text, false),
    };
    if !text.is_empty() {
        tokens.push(Token::Leaf {
            text: text.to_string(),
            line,
            opens: !terminated,
        });
    }
    buffer.clear();
}

/// Normalize `text` with the given comment markers and indent step.
pub fn normalize(
    text: &str,
    comment_markers: &[char],
    indent_step: usize,
) -> Result<Vec<NormalizedLine>> {
    BraceNormalizer::new(comment_markers.to_vec(), indent_step)?.normalize(text)
}
