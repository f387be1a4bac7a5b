//! The configuration tree.
//!
//! [`ConfigTree`] owns every [`LineNode`] in a flat arena. Parent and child
//! links are derived from indentation by [`ConfigTree::bootstrap`], then
//! patched for blocks whose extent is not expressed by indentation (banners
//! and macros).
//!
//! Links are only trustworthy right after a bootstrap. Any edit unlinks the
//! whole arena and marks the tree dirty; [`ConfigTree::commit`] rebuilds it
//! from the current text. Queries call [`ConfigTree::ensure_safe`] first and
//! fail with [`Error::Stale`] on an uncommitted tree.

use crate::classify::Classifier;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::node::{compile_regex, LineNode, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use tracing::{debug, trace, warn};

// ============================================================================
// Block Openers
// ============================================================================

static BANNER_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:set\s+)*banner\s+(?:login|motd|incoming|exec|telnet|lcd)|aaa authentication fail-message",
    )
    .expect("Invalid banner regex")
});

const MACRO_OPENER: &str = "macro name ";
const MACRO_TERMINATOR: &str = "@";

// ============================================================================
// Config Tree
// ============================================================================

/// Ordered arena of line nodes plus the settings needed to rebuild it.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<LineNode>,
    classifier: Classifier,
    ignore_blank_lines: bool,
    auto_commit: bool,
    indent_step: usize,
    commit_checkpoint: u64,
    dirty: bool,
}

impl ConfigTree {
    /// Create an empty, committed tree.
    pub fn new(dialect: Dialect, comment_markers: Option<Vec<char>>) -> Result<Self> {
        let classifier = Classifier::new(dialect, comment_markers)?;
        let mut tree = Self {
            nodes: Vec::new(),
            classifier,
            ignore_blank_lines: false,
            auto_commit: false,
            indent_step: dialect.default_indent_step(),
            commit_checkpoint: 0,
            dirty: false,
        };
        tree.commit_checkpoint = tree.checkpoint();
        Ok(tree)
    }

    /// Drop blank lines (outside banners and macros) during bootstrap.
    pub fn with_ignore_blank_lines(mut self, ignore: bool) -> Self {
        self.ignore_blank_lines = ignore;
        self
    }

    /// Commit after every mutation.
    pub fn with_auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Indent added per level by [`append_to_family`](Self::append_to_family)
    /// when a block has no children yet.
    pub fn with_indent_step(mut self, step: usize) -> Self {
        self.indent_step = step.max(1);
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.classifier.dialect()
    }

    pub fn comment_markers(&self) -> &[char] {
        self.classifier.comment_markers()
    }

    pub fn ignore_blank_lines(&self) -> bool {
        self.ignore_blank_lines
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Replace the whole tree with one built from `lines`, and commit it.
    pub fn bootstrap<S: AsRef<str>>(&mut self, lines: &[S]) {
        let nodes = self.build(lines);
        self.nodes = nodes;
        self.dirty = false;
        self.commit_checkpoint = self.checkpoint();
        debug!(
            lines = lines.len(),
            nodes = self.nodes.len(),
            dialect = %self.dialect(),
            "bootstrapped configuration"
        );
    }

    fn build<S: AsRef<str>>(&self, lines: &[S]) -> Vec<LineNode> {
        let mut nodes: Vec<LineNode> = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| self.classifier.classify(line.as_ref(), idx))
            .collect();

        let mut parents_cache: BTreeMap<usize, usize> = BTreeMap::new();
        let mut max_indent = 0;
        let mut macro_openers = Vec::new();

        for idx in 0..nodes.len() {
            let indent = nodes[idx].indent;
            let is_config_line = nodes[idx].is_config_line();

            if self.dialect().has_macros() && nodes[idx].text.starts_with(MACRO_OPENER) {
                macro_openers.push(idx);
            }

            let mut parent = None;
            if is_config_line && indent < max_indent {
                // A dedent invalidates every cached ancestor at this depth or deeper.
                parents_cache.retain(|cached_indent, _| *cached_indent < indent);
            } else {
                parent = parents_cache.get(&indent).copied();
                if let Some(cached) = parent {
                    trace!(line = idx, parent = cached, "parent cache hit");
                }
            }

            if indent > 0 {
                if parent.is_none() {
                    parent = (0..idx)
                        .rev()
                        .find(|&c| nodes[c].indent < indent && nodes[c].is_config_line());
                    if let Some(found) = parent {
                        trace!(line = idx, parent = found, "parent found by backward scan");
                        parents_cache.insert(indent, found);
                    }
                }
                if let Some(parent) = parent {
                    // A comment dedented below the line above it stays unattached.
                    let skip = nodes[idx].is_comment && idx > 0 && nodes[idx - 1].indent > indent;
                    if !skip {
                        attach(&mut nodes, parent, idx);
                    }
                }
            }

            if indent == 0 && is_config_line {
                max_indent = 0;
            } else if indent > max_indent {
                max_indent = indent;
            }
        }

        if self.dialect().has_banners() {
            link_banners(&mut nodes);
        }
        for opener in macro_openers {
            link_macro(&mut nodes, opener);
        }
        if self.ignore_blank_lines {
            nodes = drop_blank_lines(nodes);
        }
        nodes
    }

    /// Rebuild the hierarchy from the current text and refresh the commit
    /// checkpoint.
    pub fn commit(&mut self) {
        let text = self.text();
        self.bootstrap(&text);
        debug!(checkpoint = self.commit_checkpoint, "committed configuration");
    }

    // ------------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------------

    /// Order-sensitive fingerprint over every `(line_number, text)` pair.
    pub fn checkpoint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.nodes.len().hash(&mut hasher);
        for node in &self.nodes {
            node.line_number.hash(&mut hasher);
            node.text.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Checkpoint recorded by the last bootstrap or commit.
    pub fn commit_checkpoint(&self) -> u64 {
        self.commit_checkpoint
    }

    /// True when the links reflect the current text.
    pub fn search_safe(&self) -> bool {
        !self.dirty && self.checkpoint() == self.commit_checkpoint
    }

    /// Fail with [`Error::Stale`] unless the tree is safe to search.
    pub fn ensure_safe(&self) -> Result<()> {
        if self.search_safe() {
            return Ok(());
        }
        let checkpoint = self.checkpoint();
        warn!(
            checkpoint,
            committed = self.commit_checkpoint,
            "search attempted on an uncommitted configuration"
        );
        Err(Error::Stale {
            checkpoint,
            committed: self.commit_checkpoint,
        })
    }

    // ------------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> &[LineNode] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&LineNode> {
        self.nodes.get(id.0)
    }

    /// Like [`get`](Self::get), failing with [`Error::NotFound`].
    pub fn node(&self, id: NodeId) -> Result<&LineNode> {
        self.get(id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &LineNode)> + '_ {
        self.nodes.iter().enumerate().map(|(idx, n)| (NodeId(idx), n))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Root-level nodes in document order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, n)| n.is_root())
            .map(|(id, _)| id)
            .collect()
    }

    /// Current text lines in document order.
    pub fn text(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.text.clone()).collect()
    }

    // ------------------------------------------------------------------------
    // Navigation
    //
    // Unknown ids have no relatives.
    // ------------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Every descendant of `id`, sorted by document order.
    pub fn all_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        while let Some(child) = stack.pop() {
            out.push(child);
            stack.extend_from_slice(self.children(child));
        }
        out.sort();
        out.dedup();
        out
    }

    /// Ancestors of `id`, root first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            cursor = self.parent(parent);
        }
        out.reverse();
        out
    }

    /// Ancestors of `id` followed by `id` itself.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.ancestors(id);
        if self.get(id).is_some() {
            out.push(id);
        }
        out
    }

    /// Nodes sharing `id`'s parent, excluding `id`. Roots are siblings of
    /// other roots.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        if self.get(id).is_none() {
            return Vec::new();
        }
        let family = match self.parent(id) {
            Some(parent) => self.children(parent).to_vec(),
            None => self.roots(),
        };
        family.into_iter().filter(|s| *s != id).collect()
    }

    /// True when a child (any descendant when `recurse`) matches `pattern`.
    pub fn has_child_with(&self, id: NodeId, pattern: &str, recurse: bool) -> Result<bool> {
        let re = compile_regex(pattern)?;
        let candidates = if recurse {
            self.all_children(id)
        } else {
            self.children(id).to_vec()
        };
        Ok(candidates
            .into_iter()
            .any(|c| re.is_match(&self.nodes[c.0].text)))
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    fn new_node(&self, text: &str) -> Result<LineNode> {
        if self.ignore_blank_lines && text.trim().is_empty() {
            return Err(Error::invalid_arguments(
                "cannot insert a blank line while blank lines are ignored",
            ));
        }
        Ok(self.classifier.classify(text, 0))
    }

    /// Drop every link, renumber, mark dirty, and commit when configured.
    fn invalidate(&mut self) {
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            node.line_number = idx;
            node.parent = None;
            node.children.clear();
            node.child_indent = None;
        }
        self.dirty = true;
        if self.auto_commit {
            self.commit();
        }
    }

    /// Append one line at the end.
    pub fn append(&mut self, text: &str) -> Result<()> {
        let node = self.new_node(text)?;
        self.nodes.push(node);
        debug!(text, "appended line");
        self.invalidate();
        Ok(())
    }

    /// Insert one line at position `index` (0..=len).
    pub fn insert(&mut self, index: usize, text: &str) -> Result<()> {
        if index > self.nodes.len() {
            return Err(Error::invalid_arguments(format!(
                "insert position {} is past the end ({} lines)",
                index,
                self.nodes.len()
            )));
        }
        let node = self.new_node(text)?;
        self.nodes.insert(index, node);
        debug!(index, text, "inserted line");
        self.invalidate();
        Ok(())
    }

    /// Append several lines at the end.
    pub fn extend<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let new_nodes = lines
            .into_iter()
            .map(|line| self.new_node(line.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        debug!(lines = new_nodes.len(), "extended configuration");
        self.nodes.extend(new_nodes);
        self.invalidate();
        Ok(())
    }

    fn insert_relative(&mut self, pattern: &str, text: &str, offset: usize) -> Result<usize> {
        let re = compile_regex(pattern)?;
        let node = self.new_node(text)?;
        let targets: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| re.is_match(&n.text))
            .map(|(idx, _)| idx)
            .collect();
        if targets.is_empty() {
            return Err(Error::not_found(format!("no line matches '{}'", pattern)));
        }
        for idx in targets.iter().rev() {
            self.nodes.insert(idx + offset, node.clone());
        }
        debug!(pattern, text, inserted = targets.len(), "inserted line near matches");
        self.invalidate();
        Ok(targets.len())
    }

    /// Insert `text` before every line matching `pattern`; returns the
    /// number of insertions.
    pub fn insert_before(&mut self, pattern: &str, text: &str) -> Result<usize> {
        self.insert_relative(pattern, text, 0)
    }

    /// Insert `text` after every line matching `pattern`; returns the number
    /// of insertions.
    pub fn insert_after(&mut self, pattern: &str, text: &str) -> Result<usize> {
        self.insert_relative(pattern, text, 1)
    }

    /// Remove a node together with its whole subtree.
    ///
    /// Needs trustworthy links, so the tree must be committed.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        self.ensure_safe()?;
        self.node(id)?;
        let removed = self.remove_subtrees(&[id]);
        debug!(node = %id, removed, "removed subtree");
        self.invalidate();
        Ok(())
    }

    /// Drop every node in the subtrees rooted at `heads`; returns how many
    /// nodes went away. Links must be current.
    fn remove_subtrees(&mut self, heads: &[NodeId]) -> usize {
        let mut doomed: BTreeSet<usize> = BTreeSet::new();
        for head in heads {
            doomed.insert(head.0);
            doomed.extend(self.all_children(*head).into_iter().map(|c| c.0));
        }
        let before = self.nodes.len();
        let mut idx = 0;
        self.nodes.retain(|_| {
            let keep = !doomed.contains(&idx);
            idx += 1;
            keep
        });
        before - self.nodes.len()
    }

    /// Add `text` as the last line of `id`'s family, after its deepest
    /// descendant. Returns the position of the new line.
    ///
    /// With `auto_indent` the text is re-indented to the block's child
    /// indent, or one indent step past the parent when the block is empty.
    /// Otherwise the text keeps its own indentation, which must be deeper
    /// than the parent's.
    pub fn append_to_family(
        &mut self,
        id: NodeId,
        text: &str,
        auto_indent: bool,
    ) -> Result<NodeId> {
        self.ensure_safe()?;
        let parent = self.node(id)?;
        if parent.is_comment() {
            return Err(Error::invalid_arguments(format!(
                "comment line {} cannot own children",
                id
            )));
        }
        let parent_indent = parent.indent();
        let text = if auto_indent {
            let width = parent
                .child_indent()
                .filter(|w| *w > parent_indent)
                .unwrap_or(parent_indent + self.indent_step);
            format!("{}{}", " ".repeat(width), text.trim_start())
        } else {
            text.to_string()
        };
        let node = self.new_node(&text)?;
        if node.indent() <= parent_indent {
            return Err(Error::invalid_arguments(format!(
                "'{}' is not indented past its parent (indent {})",
                text, parent_indent
            )));
        }

        let position = self
            .all_children(id)
            .last()
            .map_or(id.0 + 1, |last| last.0 + 1);
        self.nodes.insert(position, node);
        debug!(parent = %id, position, text = %text, "appended line to family");
        self.invalidate();
        Ok(NodeId(position))
    }

    /// Remove every direct child of `id` matching `pattern`, each with its
    /// subtree; returns how many children matched.
    pub fn delete_children_matching(&mut self, id: NodeId, pattern: &str) -> Result<usize> {
        self.ensure_safe()?;
        self.node(id)?;
        let re = compile_regex(pattern)?;
        let heads: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|c| re.is_match(&self.nodes[c.0].text))
            .collect();
        if heads.is_empty() {
            return Ok(0);
        }
        let removed = self.remove_subtrees(&heads);
        debug!(
            parent = %id,
            pattern,
            children = heads.len(),
            removed,
            "deleted matching children"
        );
        self.invalidate();
        Ok(heads.len())
    }

    /// Remove the first line whose text equals `text`, with its subtree.
    pub fn remove_text(&mut self, text: &str) -> Result<()> {
        self.ensure_safe()?;
        let id = self
            .iter()
            .find(|(_, n)| n.text == text)
            .map(|(id, _)| id)
            .ok_or_else(|| Error::not_found(text.to_string()))?;
        self.remove(id)
    }

    /// Replace the text of one line; its kind is re-derived.
    pub fn replace_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.node(id)?;
        let fresh = self.new_node(text)?;
        let node = &mut self.nodes[id.0];
        node.set_text(text);
        node.kind = fresh.kind;
        node.is_comment = fresh.is_comment;
        debug!(node = %id, text, "replaced line text");
        self.invalidate();
        Ok(())
    }

    /// Apply a regex substitution to every line; returns how many lines
    /// changed.
    pub fn re_sub(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        let re = compile_regex(pattern)?;
        let mut changed = 0;
        for idx in 0..self.nodes.len() {
            let rewritten = re.replace_all(&self.nodes[idx].text, replacement);
            if rewritten != self.nodes[idx].text {
                let rewritten = rewritten.into_owned();
                let fresh = self.classifier.classify(&rewritten, idx);
                let node = &mut self.nodes[idx];
                node.set_text(rewritten);
                node.kind = fresh.kind;
                node.is_comment = fresh.is_comment;
                changed += 1;
            }
        }
        debug!(pattern, replacement, changed, "substituted text");
        if changed > 0 {
            self.invalidate();
        }
        Ok(changed)
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.nodes.clear();
        debug!("cleared configuration");
        self.invalidate();
    }
}

// ============================================================================
// Linking
// ============================================================================

fn attach(nodes: &mut [LineNode], parent: usize, child: usize) {
    nodes[child].parent = Some(NodeId(parent));
    let child_indent = nodes[child].indent;
    let parent_node = &mut nodes[parent];
    if !parent_node.children.contains(&NodeId(child)) {
        parent_node.children.push(NodeId(child));
    }
    parent_node.child_indent.get_or_insert(child_indent);
}

/// Move `child` under `parent`, detaching it from any previous parent.
fn relink(nodes: &mut [LineNode], parent: usize, child: usize) {
    if let Some(previous) = nodes[child].parent {
        if previous.0 != parent {
            nodes[previous.0].children.retain(|c| c.0 != child);
            let first = nodes[previous.0].children.first().map(|c| nodes[c.0].indent);
            nodes[previous.0].child_indent = first;
        }
    }
    nodes[child].parent = Some(NodeId(parent));
    if !nodes[parent].children.contains(&NodeId(child)) {
        nodes[parent].children.push(NodeId(child));
    }
    nodes[parent].child_indent = Some(0);
}

/// Delimiter of a banner opener: the first non-space character after the
/// opening keywords.
fn banner_delimiter(text: &str) -> Option<char> {
    let opener = BANNER_OPENER.find(text)?;
    text[opener.end()..].trim_start().chars().next()
}

fn link_banners(nodes: &mut [LineNode]) {
    let mut idx = 0;
    while idx < nodes.len() {
        if !BANNER_OPENER.is_match(&nodes[idx].text) {
            idx += 1;
            continue;
        }
        let opener = idx;
        nodes[opener].keep_blank = true;

        let Some(delimiter) = banner_delimiter(&nodes[opener].text) else {
            warn!(line = nodes[opener].line_number, "banner without a delimiter");
            idx += 1;
            continue;
        };
        // Opened and closed on the same line.
        if nodes[opener].text.split(delimiter).count() > 2 {
            idx += 1;
            continue;
        }

        let mut cursor = opener + 1;
        let mut closed = false;
        while cursor < nodes.len() {
            relink(nodes, opener, cursor);
            nodes[cursor].keep_blank = true;
            trace!(banner = opener, line = cursor, "banner body line");
            if nodes[cursor].text.trim().contains(delimiter) {
                closed = true;
                break;
            }
            cursor += 1;
        }
        if !closed {
            warn!(
                line = nodes[opener].line_number,
                %delimiter,
                "banner is not closed before the end of the configuration"
            );
        }
        idx = cursor + 1;
    }
}

fn link_macro(nodes: &mut [LineNode], opener: usize) {
    nodes[opener].keep_blank = true;
    nodes[opener].child_indent = Some(0);
    let mut cursor = opener + 1;
    while cursor < nodes.len() {
        relink(nodes, opener, cursor);
        nodes[cursor].keep_blank = true;
        trace!(macro_line = opener, line = cursor, "macro body line");
        if nodes[cursor].text.trim_end() == MACRO_TERMINATOR {
            return;
        }
        cursor += 1;
    }
    warn!(
        line = nodes[opener].line_number,
        "macro is not terminated by '@' before the end of the configuration"
    );
}

/// Remove blank nodes that are not inside a banner or macro, remapping links.
fn drop_blank_lines(nodes: Vec<LineNode>) -> Vec<LineNode> {
    let mut remap: Vec<Option<usize>> = Vec::with_capacity(nodes.len());
    let mut next = 0;
    for node in &nodes {
        if node.is_blank && !node.keep_blank {
            remap.push(None);
        } else {
            remap.push(Some(next));
            next += 1;
        }
    }

    nodes
        .into_iter()
        .zip(remap.iter())
        .filter(|(_, slot)| slot.is_some())
        .map(|(mut node, _)| {
            node.parent = node.parent.and_then(|p| remap[p.0]).map(NodeId);
            node.children = node
                .children
                .iter()
                .filter_map(|c| remap[c.0].map(NodeId))
                .collect();
            node
        })
        .collect()
}
