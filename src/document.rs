//! Client façade over the tree and query engine.
//!
//! A [`ConfigDocument`] owns its parse options and exactly one
//! [`ConfigTree`]. Text loaded into it is split with the configured
//! line-ending pattern, sent through the brace normalizer when the dialect is
//! brace-delimited, and bootstrapped into the tree.
//!
//! ```
//! use confparse::prelude::*;
//!
//! let doc = ConfigDocument::parse(
//!     "interface Gi1/1\n shutdown\ninterface Gi1/2\n description uplink\n",
//!     ParseOptions::new(Dialect::Ios),
//! )
//! .unwrap();
//! let shut = doc
//!     .find_parent_objects("^interface", "shutdown", false, &MatchOptions::default())
//!     .unwrap();
//! assert_eq!(doc.tree().node(shut[0]).unwrap().text(), "interface Gi1/1");
//! ```

use crate::brace::{BraceNormalizer, NormalizedLine};
use crate::config::ParseOptions;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::node::{compile_regex, LineNode, NodeId};
use crate::query::{Branch, BranchOptions, MatchOptions, QueryEngine};
use crate::tree::ConfigTree;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// A parsed configuration plus the settings it was parsed with.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    options: ParseOptions,
    splitter: Regex,
    normalizer: Option<BraceNormalizer>,
    tree: ConfigTree,
}

impl ConfigDocument {
    /// Create an empty document.
    pub fn new(options: ParseOptions) -> Result<Self> {
        options.validate()?;
        let splitter = compile_regex(&options.line_split)?;
        let normalizer = if options.dialect.is_brace_delimited() {
            Some(BraceNormalizer::new(
                options.resolved_comment_markers(),
                options.resolved_indent_step(),
            )?)
        } else {
            None
        };
        let tree = ConfigTree::new(options.dialect, options.comment_markers.clone())?
            .with_ignore_blank_lines(options.ignore_blank_lines)
            .with_auto_commit(options.auto_commit)
            .with_indent_step(options.resolved_indent_step());
        Ok(Self {
            options,
            splitter,
            normalizer,
            tree,
        })
    }

    /// Parse configuration text.
    pub fn parse(text: &str, options: ParseOptions) -> Result<Self> {
        let mut doc = Self::new(options)?;
        doc.load_text(text)?;
        Ok(doc)
    }

    /// Parse configuration that is already split into lines.
    pub fn parse_lines<S: AsRef<str>>(lines: &[S], options: ParseOptions) -> Result<Self> {
        let mut doc = Self::new(options)?;
        doc.load_lines(lines)?;
        Ok(doc)
    }

    /// Read and parse a configuration file in the configured encoding.
    ///
    /// Bytes that are not valid in that encoding fail with
    /// [`Error::Io`] of kind `InvalidData`.
    pub fn open(path: impl AsRef<Path>, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let encoding = options.resolved_encoding()?;
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
        if had_errors {
            return Err(Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("input is not valid {}", encoding.name()),
                ),
            ));
        }
        info!(
            path = %path.display(),
            dialect = %options.dialect,
            encoding = encoding.name(),
            "loading configuration file"
        );
        Self::parse(&text, options)
    }

    /// Replace the content with `text`.
    ///
    /// On error the previously loaded tree is left untouched.
    pub fn load_text(&mut self, text: &str) -> Result<()> {
        let lines = self.split_lines(text);
        self.load_lines(&lines)
    }

    /// Replace the content with pre-split `lines`.
    ///
    /// On error the previously loaded tree is left untouched.
    pub fn load_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        match &self.normalizer {
            Some(normalizer) => {
                let rendered: Vec<String> = normalizer
                    .normalize_lines(lines)?
                    .iter()
                    .map(NormalizedLine::rendered)
                    .collect();
                self.tree.bootstrap(&rendered);
            }
            None => self.tree.bootstrap(lines),
        }
        debug!(
            input_lines = lines.len(),
            nodes = self.tree.len(),
            "loaded configuration"
        );
        Ok(())
    }

    /// Split `text` with the configured line-ending pattern.
    ///
    /// A terminator at the very end does not yield a trailing empty line.
    pub fn split_lines(&self, text: &str) -> Vec<String> {
        let mut lines: Vec<String> = self.splitter.split(text).map(str::to_string).collect();
        if lines.last().is_some_and(|last| last.is_empty()) {
            lines.pop();
        }
        lines
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Direct access to the tree for mutations not wrapped here.
    pub fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    pub fn query(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.tree)
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// Current text, one entry per line.
    pub fn get_text(&self) -> Vec<String> {
        self.tree.text()
    }

    /// Current nodes in document order.
    pub fn objects(&self) -> &[LineNode] {
        self.tree.nodes()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Current text re-emitted with braces, one entry per line.
    ///
    /// Nesting is taken from indentation, so this works for any dialect.
    pub fn brace_text(&self) -> Result<Vec<String>> {
        let normalizer = match &self.normalizer {
            Some(normalizer) => normalizer.clone(),
            None => BraceNormalizer::new(
                self.tree.comment_markers().to_vec(),
                self.options.resolved_indent_step(),
            )?,
        };
        let lines: Vec<NormalizedLine> = self
            .tree
            .nodes()
            .iter()
            .filter(|node| !node.is_blank())
            .enumerate()
            .map(|(line_number, node)| NormalizedLine {
                indent: node.indent(),
                line_number,
                text: node.text().trim().to_string(),
            })
            .collect();
        Ok(normalizer.render_braces(&lines))
    }

    /// Write the current text to `path`, one line per entry, in the
    /// configured encoding.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut out = String::new();
        for line in self.tree.text() {
            out.push_str(&line);
            out.push('\n');
        }
        let encoding = self.options.resolved_encoding()?;
        let (bytes, used, unmappable) = encoding.encode(&out);
        if unmappable {
            return Err(Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("text cannot be written as {}", used.name()),
                ),
            ));
        }
        std::fs::write(path, bytes).map_err(|e| Error::io(path, e))?;
        debug!(path = %path.display(), lines = self.tree.len(), "saved configuration");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------------

    /// Rebuild the hierarchy from the current text.
    pub fn commit(&mut self) {
        self.tree.commit();
    }

    pub fn search_safe(&self) -> bool {
        self.tree.search_safe()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn find_objects(&self, pattern: &str, opts: &MatchOptions) -> Result<Vec<NodeId>> {
        self.query().find_objects(pattern, opts)
    }

    pub fn find_top_level_objects(
        &self,
        pattern: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.query().find_top_level_objects(pattern, recurse, opts)
    }

    pub fn find_parent_objects(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.query().find_parent_objects(parent, child, recurse, opts)
    }

    pub fn find_parent_objects_without_child(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.query()
            .find_parent_objects_without_child(parent, child, recurse, opts)
    }

    pub fn find_child_objects(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.query().find_child_objects(parent, child, recurse, opts)
    }

    pub fn find_object_branches(
        &self,
        patterns: &[&str],
        opts: &BranchOptions,
    ) -> Result<Vec<Branch>> {
        self.query().find_object_branches(patterns, opts)
    }

    pub fn re_search_children(
        &self,
        id: NodeId,
        pattern: &str,
        recurse: bool,
    ) -> Result<Vec<NodeId>> {
        self.query().re_search_children(id, pattern, recurse)
    }

    pub fn re_match_iter_typed<T>(
        &self,
        id: NodeId,
        pattern: &str,
        group: usize,
        recurse: bool,
        default: T,
    ) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.query()
            .re_match_iter_typed(id, pattern, group, recurse, default)
    }

    /// Text of every matching line, a shortcut for scripts.
    pub fn find_lines(&self, pattern: &str) -> Result<Vec<String>> {
        let ids = self.find_objects(pattern, &MatchOptions::default())?;
        Ok(self
            .query()
            .resolve(&ids)
            .into_iter()
            .map(|node| node.text().to_string())
            .collect())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub fn append(&mut self, text: &str) -> Result<()> {
        self.tree.append(text)
    }

    pub fn insert(&mut self, index: usize, text: &str) -> Result<()> {
        self.tree.insert(index, text)
    }

    pub fn extend<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tree.extend(lines)
    }

    pub fn insert_before(&mut self, pattern: &str, text: &str) -> Result<usize> {
        self.tree.insert_before(pattern, text)
    }

    pub fn insert_after(&mut self, pattern: &str, text: &str) -> Result<usize> {
        self.tree.insert_after(pattern, text)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.tree.remove(id)
    }

    pub fn remove_text(&mut self, text: &str) -> Result<()> {
        self.tree.remove_text(text)
    }

    pub fn replace_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.tree.replace_text(id, text)
    }

    pub fn re_sub(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        self.tree.re_sub(pattern, replacement)
    }

    pub fn append_to_family(
        &mut self,
        id: NodeId,
        text: &str,
        auto_indent: bool,
    ) -> Result<NodeId> {
        self.tree.append_to_family(id, text, auto_indent)
    }

    pub fn delete_children_matching(&mut self, id: NodeId, pattern: &str) -> Result<usize> {
        self.tree.delete_children_matching(id, pattern)
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }
}
