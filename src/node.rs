//! Line nodes, the vertices of a configuration tree.
//!
//! Nodes live in an arena owned by [`ConfigTree`](crate::tree::ConfigTree);
//! parent and child links are [`NodeId`] indices into that arena rather than
//! references, so a node never owns or borrows another node.

use crate::classify::LineKind;
use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Arena handle for a [`LineNode`].
///
/// A `NodeId` is only meaningful for the tree that produced it, and only until
/// the next commit rebuilds the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in document order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configuration statement plus its structural metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNode {
    pub(crate) text: String,
    pub(crate) line_number: usize,
    pub(crate) indent: usize,
    pub(crate) child_indent: Option<usize>,
    pub(crate) is_comment: bool,
    pub(crate) is_blank: bool,
    pub(crate) keep_blank: bool,
    pub(crate) kind: LineKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl LineNode {
    pub(crate) fn new(text: impl Into<String>, line_number: usize, kind: LineKind) -> Self {
        let text = text.into();
        let indent = leading_whitespace(&text);
        let is_blank = text.trim().is_empty();
        Self {
            text,
            line_number,
            indent,
            child_indent: None,
            is_comment: false,
            is_blank,
            keep_blank: false,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Raw text, including leading indentation.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Width of the leading whitespace.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Indentation of the first attached child, if any child was attached.
    pub fn child_indent(&self) -> Option<usize> {
        self.child_indent
    }

    pub fn is_comment(&self) -> bool {
        self.is_comment
    }

    pub fn is_blank(&self) -> bool {
        self.is_blank
    }

    /// Blank lines inside banner and macro bodies survive blank suppression.
    pub fn keep_blank(&self) -> bool {
        self.keep_blank
    }

    /// Vendor kind assigned by the classifier.
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// A node is a root when nothing owns it.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// True for statements: neither blank nor a comment.
    pub fn is_config_line(&self) -> bool {
        !self.is_blank && !self.is_comment
    }

    /// Search the text for `pattern` and return the whole match.
    pub fn re_search(&self, pattern: &str) -> Result<Option<String>> {
        let re = compile_regex(pattern)?;
        Ok(re.find(&self.text).map(|m| m.as_str().to_string()))
    }

    /// Search the text for `pattern` and return capture group `group`.
    ///
    /// Group 0 is the whole match. A group that did not participate in the
    /// match yields `None`.
    pub fn re_match(&self, pattern: &str, group: usize) -> Result<Option<String>> {
        let re = compile_regex(pattern)?;
        if group >= re.captures_len() {
            return Err(Error::invalid_arguments(format!(
                "pattern '{}' has no capture group {}",
                pattern, group
            )));
        }
        Ok(re
            .captures(&self.text)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str().to_string()))
    }

    /// Best-effort negation of the statement.
    ///
    /// A leading `no` is removed; anything else gains a `no ` prefix. The
    /// original indentation is preserved.
    pub fn uncfg_text(&self) -> String {
        let (lead, body) = self.text.split_at(self.text.len() - self.text.trim_start().len());
        match body.strip_prefix("no ") {
            Some(rest) => format!("{}{}", lead, rest.trim_start()),
            None => format!("{}no {}", lead, body),
        }
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.indent = leading_whitespace(&self.text);
        self.is_blank = self.text.trim().is_empty();
    }
}

impl std::fmt::Display for LineNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid_pattern(pattern, &e))
}

/// Width of the leading whitespace run, counted in characters.
pub(crate) fn leading_whitespace(text: &str) -> usize {
    text.chars().take_while(|c| c.is_whitespace()).count()
}
