//! Read-only searches over a committed [`ConfigTree`].
//!
//! Three families of search are offered:
//!
//! - single pattern: [`QueryEngine::find_objects`] and friends;
//! - parent/child pairs: [`QueryEngine::find_parent_objects`],
//!   [`QueryEngine::find_parent_objects_without_child`],
//!   [`QueryEngine::find_child_objects`];
//! - multi-level branches: [`QueryEngine::find_object_branches`], which
//!   walks the hierarchy one level per pattern and returns fixed-length
//!   [`Branch`]es.
//!
//! Every search checks [`ConfigTree::ensure_safe`] first.

use crate::error::{Error, Result};
use crate::node::{compile_regex, LineNode, NodeId};
use crate::tree::ConfigTree;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

// ============================================================================
// Options
// ============================================================================

/// How a pattern is turned into a regular expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Anchor the pattern to the whole line (indentation included)
    pub exact_match: bool,
    /// Treat each literal whitespace run in the pattern as `\s+`
    pub ignore_ws: bool,
    /// Match the pattern literally
    pub escape_chars: bool,
    /// Reverse the order of the results
    pub reverse: bool,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exact_match(mut self, exact_match: bool) -> Self {
        self.exact_match = exact_match;
        self
    }

    pub fn with_ignore_ws(mut self, ignore_ws: bool) -> Self {
        self.ignore_ws = ignore_ws;
        self
    }

    pub fn with_escape_chars(mut self, escape_chars: bool) -> Self {
        self.escape_chars = escape_chars;
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Compile `pattern` according to these options.
    pub fn compile(&self, pattern: &str) -> Result<Regex> {
        let mut source = if self.escape_chars {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        if self.ignore_ws {
            source = WHITESPACE_RUN.replace_all(&source, r"\s+").into_owned();
        }
        if self.exact_match {
            source = format!("^(?:{})$", source);
        }
        compile_regex(&source)
    }
}

/// Options for [`QueryEngine::find_object_branches`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchOptions {
    /// Keep branches that stopped matching before the last pattern
    pub empty_branches: bool,
    /// Return regex captures instead of node handles
    pub regex_groups: bool,
    /// Reverse the order of the returned branches
    pub reverse: bool,
    pub ignore_ws: bool,
    pub escape_chars: bool,
}

impl BranchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_empty_branches(mut self, empty_branches: bool) -> Self {
        self.empty_branches = empty_branches;
        self
    }

    pub fn with_regex_groups(mut self, regex_groups: bool) -> Self {
        self.regex_groups = regex_groups;
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_ignore_ws(mut self, ignore_ws: bool) -> Self {
        self.ignore_ws = ignore_ws;
        self
    }

    pub fn with_escape_chars(mut self, escape_chars: bool) -> Self {
        self.escape_chars = escape_chars;
        self
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions::new()
            .with_ignore_ws(self.ignore_ws)
            .with_escape_chars(self.escape_chars)
    }
}

// ============================================================================
// Branches
// ============================================================================

/// One slot of a [`Branch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchElement {
    /// The node matched at this level
    Node(NodeId),
    /// Capture groups of the match at this level; a pattern without groups
    /// captures the whole line
    Captures(Vec<Option<String>>),
    /// Nothing matched at this level
    Empty,
}

impl BranchElement {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            BranchElement::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BranchElement::Empty)
    }
}

/// One path through the hierarchy, one element per pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch(Vec<BranchElement>);

impl Branch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn elements(&self) -> &[BranchElement] {
        &self.0
    }

    pub fn get(&self, level: usize) -> Option<&BranchElement> {
        self.0.get(level)
    }

    /// Node handles per level; `None` where nothing matched.
    pub fn nodes(&self) -> Vec<Option<NodeId>> {
        self.0.iter().map(BranchElement::node).collect()
    }

    /// True when every level matched.
    pub fn is_complete(&self) -> bool {
        !self.0.iter().any(BranchElement::is_empty)
    }
}

impl IntoIterator for Branch {
    type Item = BranchElement;
    type IntoIter = std::vec::IntoIter<BranchElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Query Engine
// ============================================================================

/// Search front end borrowing a tree.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'t> {
    tree: &'t ConfigTree,
}

impl<'t> QueryEngine<'t> {
    pub fn new(tree: &'t ConfigTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &'t ConfigTree {
        self.tree
    }

    /// Resolve handles into nodes, skipping unknown ids.
    pub fn resolve(&self, ids: &[NodeId]) -> Vec<&'t LineNode> {
        ids.iter().filter_map(|id| self.tree.get(*id)).collect()
    }

    fn text(&self, id: NodeId) -> &'t str {
        self.tree.get(id).map(LineNode::text).unwrap_or_default()
    }

    fn matching<I>(&self, candidates: I, re: &Regex) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        candidates
            .into_iter()
            .filter(|id| re.is_match(self.text(*id)))
            .collect()
    }

    fn descendants(&self, id: NodeId, recurse: bool) -> Vec<NodeId> {
        if recurse {
            self.tree.all_children(id)
        } else {
            self.tree.children(id).to_vec()
        }
    }

    fn finish(mut ids: Vec<NodeId>, reverse: bool) -> Vec<NodeId> {
        if reverse {
            ids.reverse();
        }
        ids
    }

    // ------------------------------------------------------------------------
    // Single pattern
    // ------------------------------------------------------------------------

    /// Every line whose text matches `pattern`, in document order.
    pub fn find_objects(&self, pattern: &str, opts: &MatchOptions) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        let re = opts.compile(pattern)?;
        let hits = self.matching(self.tree.ids(), &re);
        debug!(pattern, hits = hits.len(), "find_objects");
        Ok(Self::finish(hits, opts.reverse))
    }

    /// Root-level lines matching `pattern`; every line when `recurse`.
    pub fn find_top_level_objects(
        &self,
        pattern: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        let re = opts.compile(pattern)?;
        let candidates = if recurse {
            self.tree.ids().collect()
        } else {
            self.tree.roots()
        };
        let hits = self.matching(candidates, &re);
        debug!(pattern, recurse, hits = hits.len(), "find_top_level_objects");
        Ok(Self::finish(hits, opts.reverse))
    }

    /// Capture group `group` of the first root-level line matching
    /// `pattern`, parsed as `T`.
    pub fn capture_first<T>(&self, pattern: &str, group: usize) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.tree.ensure_safe()?;
        let re = compile_regex(pattern)?;
        if group >= re.captures_len() {
            return Err(Error::invalid_arguments(format!(
                "pattern '{}' has no capture group {}",
                pattern, group
            )));
        }
        let captured = self.tree.roots().into_iter().find_map(|id| {
            re.captures(self.text(id))
                .and_then(|caps| caps.get(group))
                .map(|m| m.as_str().to_string())
        });
        captured.map(|raw| parse_capture(&raw)).transpose()
    }

    // ------------------------------------------------------------------------
    // Within one family
    // ------------------------------------------------------------------------

    /// Children of `id` (descendants when `recurse`) whose text matches
    /// `pattern`, in document order.
    pub fn re_search_children(
        &self,
        id: NodeId,
        pattern: &str,
        recurse: bool,
    ) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        self.tree.node(id)?;
        let re = compile_regex(pattern)?;
        let hits = self.matching(self.descendants(id, recurse), &re);
        debug!(node = %id, pattern, recurse, hits = hits.len(), "re_search_children");
        Ok(hits)
    }

    /// Capture group `group` parsed as `T`, taken from `id` itself or else
    /// from its first matching child (descendant when `recurse`); `default`
    /// when nothing matches.
    pub fn re_match_iter_typed<T>(
        &self,
        id: NodeId,
        pattern: &str,
        group: usize,
        recurse: bool,
        default: T,
    ) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.tree.ensure_safe()?;
        self.tree.node(id)?;
        let re = compile_regex(pattern)?;
        if group >= re.captures_len() {
            return Err(Error::invalid_arguments(format!(
                "pattern '{}' has no capture group {}",
                pattern, group
            )));
        }
        let captured = std::iter::once(id)
            .chain(self.descendants(id, recurse))
            .find_map(|candidate| {
                re.captures(self.text(candidate))
                    .and_then(|caps| caps.get(group))
                    .map(|m| m.as_str().to_string())
            });
        match captured {
            Some(raw) => parse_capture(&raw),
            None => Ok(default),
        }
    }

    // ------------------------------------------------------------------------
    // Parent / child pairs
    // ------------------------------------------------------------------------

    /// Lines matching `parent` with at least one child (any descendant when
    /// `recurse`) matching `child`.
    pub fn find_parent_objects(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        let parent_re = opts.compile(parent)?;
        let child_re = opts.compile(child)?;
        let hits: Vec<NodeId> = self
            .matching(self.tree.ids(), &parent_re)
            .into_iter()
            .filter(|id| !self.matching(self.descendants(*id, recurse), &child_re).is_empty())
            .collect();
        debug!(parent, child, recurse, hits = hits.len(), "find_parent_objects");
        Ok(Self::finish(hits, opts.reverse))
    }

    /// Lines matching `parent` with no child (no descendant when `recurse`)
    /// matching `child`.
    pub fn find_parent_objects_without_child(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        let parent_re = opts.compile(parent)?;
        let child_re = opts.compile(child)?;
        let hits: Vec<NodeId> = self
            .matching(self.tree.ids(), &parent_re)
            .into_iter()
            .filter(|id| self.matching(self.descendants(*id, recurse), &child_re).is_empty())
            .collect();
        debug!(
            parent,
            child,
            recurse,
            hits = hits.len(),
            "find_parent_objects_without_child"
        );
        Ok(Self::finish(hits, opts.reverse))
    }

    /// Children (descendants when `recurse`) matching `child` of every line
    /// matching `parent`, de-duplicated in document order.
    pub fn find_child_objects(
        &self,
        parent: &str,
        child: &str,
        recurse: bool,
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        self.tree.ensure_safe()?;
        let parent_re = opts.compile(parent)?;
        let child_re = opts.compile(child)?;
        let hits: BTreeSet<NodeId> = self
            .matching(self.tree.ids(), &parent_re)
            .into_iter()
            .flat_map(|id| self.matching(self.descendants(id, recurse), &child_re))
            .collect();
        debug!(parent, child, recurse, hits = hits.len(), "find_child_objects");
        Ok(Self::finish(hits.into_iter().collect(), opts.reverse))
    }

    /// First element of every complete branch, de-duplicated and sorted.
    pub fn find_parent_objects_by_branch(
        &self,
        patterns: &[&str],
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        let hits = self.branch_ends(patterns, opts, |nodes| nodes.first().copied().flatten())?;
        Ok(Self::finish(hits, opts.reverse))
    }

    /// Last element of every complete branch, de-duplicated and sorted.
    pub fn find_child_objects_by_branch(
        &self,
        patterns: &[&str],
        opts: &MatchOptions,
    ) -> Result<Vec<NodeId>> {
        let hits = self.branch_ends(patterns, opts, |nodes| nodes.last().copied().flatten())?;
        Ok(Self::finish(hits, opts.reverse))
    }

    fn branch_ends<F>(&self, patterns: &[&str], opts: &MatchOptions, pick: F) -> Result<Vec<NodeId>>
    where
        F: Fn(&[Option<NodeId>]) -> Option<NodeId>,
    {
        let branch_opts = BranchOptions::new()
            .with_ignore_ws(opts.ignore_ws)
            .with_escape_chars(opts.escape_chars);
        let picked: BTreeSet<NodeId> = self
            .find_object_branches(patterns, &branch_opts)?
            .iter()
            .filter_map(|branch| pick(branch.nodes().as_slice()))
            .collect();
        Ok(picked.into_iter().collect())
    }

    // ------------------------------------------------------------------------
    // Branch search
    // ------------------------------------------------------------------------

    /// Walk the hierarchy one level per pattern.
    ///
    /// Seeds are root-level lines matching `patterns[0]`. At each following
    /// level every branch whose tail matched forks once per matching child of
    /// that tail; a tail without matching children, or a tail that is already
    /// empty, gets an empty slot instead. Every returned branch therefore has
    /// exactly `patterns.len()` elements.
    pub fn find_object_branches(
        &self,
        patterns: &[&str],
        opts: &BranchOptions,
    ) -> Result<Vec<Branch>> {
        if patterns.len() < 2 {
            return Err(Error::invalid_arguments(format!(
                "branch search needs at least two patterns, got {}",
                patterns.len()
            )));
        }
        self.tree.ensure_safe()?;

        let match_opts = opts.match_options();
        let regexes = patterns
            .iter()
            .map(|p| match_opts.compile(p))
            .collect::<Result<Vec<_>>>()?;

        let seeds = self.matching(self.tree.roots(), &regexes[0]);
        let mut branches: Vec<Vec<Option<NodeId>>> = if seeds.is_empty() {
            vec![vec![None]]
        } else {
            seeds.into_iter().map(|id| vec![Some(id)]).collect()
        };

        for re in &regexes[1..] {
            let mut grown = Vec::with_capacity(branches.len());
            for mut branch in branches {
                let tail = branch.last().copied().flatten();
                let kids = match tail {
                    Some(tail) => self.matching(self.tree.children(tail).iter().copied(), re),
                    None => Vec::new(),
                };
                if kids.is_empty() {
                    branch.push(None);
                    grown.push(branch);
                    continue;
                }
                for kid in kids {
                    let mut fork = branch.clone();
                    fork.push(Some(kid));
                    grown.push(fork);
                }
            }
            branches = grown;
        }

        if !opts.empty_branches {
            branches.retain(|branch| branch.iter().all(Option::is_some));
        }

        let mut out: Vec<Branch> = branches
            .into_iter()
            .map(|branch| self.to_branch(branch, &regexes, opts.regex_groups))
            .collect();
        if opts.reverse {
            out.reverse();
        }
        debug!(
            patterns = patterns.len(),
            branches = out.len(),
            "find_object_branches"
        );
        Ok(out)
    }

    fn to_branch(&self, slots: Vec<Option<NodeId>>, regexes: &[Regex], groups: bool) -> Branch {
        let elements = slots
            .into_iter()
            .zip(regexes)
            .map(|(slot, re)| match slot {
                None => BranchElement::Empty,
                Some(id) if !groups => BranchElement::Node(id),
                Some(id) => BranchElement::Captures(captures(re, self.text(id))),
            })
            .collect();
        Branch(elements)
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// Root-level statements split into those with children and those
    /// without. Comments are excluded.
    pub fn config_hierarchy(&self) -> Result<(Vec<NodeId>, Vec<NodeId>)> {
        self.tree.ensure_safe()?;
        let mut parents = Vec::new();
        let mut leaves = Vec::new();
        for id in self.tree.roots() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            if node.is_comment() || node.is_blank() {
                continue;
            }
            if node.has_children() {
                parents.push(id);
            } else {
                leaves.push(id);
            }
        }
        Ok((parents, leaves))
    }

    /// Every node that is not a comment, in document order.
    pub fn iter_config_lines(&self) -> impl Iterator<Item = (NodeId, &'t LineNode)> + 't {
        self.tree.iter().filter(|(_, node)| !node.is_comment())
    }
}

fn captures(re: &Regex, text: &str) -> Vec<Option<String>> {
    match re.captures(text) {
        None => vec![None],
        Some(caps) if caps.len() == 1 => vec![Some(text.to_string())],
        Some(caps) => caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect(),
    }
}

fn parse_capture<T>(raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| Error::invalid_arguments(format!("cannot convert '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use pretty_assertions::assert_eq;

    const INTERFACES: &[&str] = &[
        "!",
        "interface FastEthernet0/1",
        " switchport access vlan 532",
        " spanning-tree vlan 532 cost 3",
        "!",
        "interface FastEthernet0/2",
        " switchport access vlan 300",
        " spanning-tree portfast",
        "!",
        "interface FastEthernet0/3",
        " duplex full",
        " speed 100",
        " switchport access vlan 300",
        " spanning-tree portfast",
        "!",
    ];

    fn tree(lines: &[&str]) -> ConfigTree {
        let mut tree = ConfigTree::new(Dialect::Ios, None).unwrap();
        tree.bootstrap(lines);
        tree
    }

    fn ids(raw: &[usize]) -> Vec<NodeId> {
        raw.iter().map(|i| NodeId(*i)).collect()
    }

    #[test]
    fn test_find_objects() {
        let t = tree(INTERFACES);
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert_eq!(q.find_objects("^interface", &opts).unwrap(), ids(&[1, 5, 9]));
        assert_eq!(
            q.find_objects("^interface", &opts.with_reverse(true)).unwrap(),
            ids(&[9, 5, 1])
        );
        assert!(q
            .find_objects("interface", &opts.with_exact_match(true))
            .unwrap()
            .is_empty());
        assert_eq!(
            q.find_objects("interface FastEthernet0/2", &opts.with_exact_match(true))
                .unwrap(),
            ids(&[5])
        );
    }

    #[test]
    fn test_ignore_ws_and_escape_chars() {
        let t = tree(&["ip  route   0.0.0.0 0.0.0.0 10.0.0.1", "ip route(x)"]);
        let q = QueryEngine::new(&t);
        assert!(q
            .find_objects("ip route 0.0.0.0", &MatchOptions::new())
            .unwrap()
            .is_empty());
        assert_eq!(
            q.find_objects("ip route 0.0.0.0", &MatchOptions::new().with_ignore_ws(true))
                .unwrap(),
            ids(&[0])
        );
        assert_eq!(
            q.find_objects("route(x)", &MatchOptions::new().with_escape_chars(true))
                .unwrap(),
            ids(&[1])
        );
    }

    #[test]
    fn test_find_parent_objects() {
        let t = tree(INTERFACES);
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert_eq!(
            q.find_parent_objects("^interface", "switchport access vlan 300", false, &opts)
                .unwrap(),
            ids(&[5, 9])
        );
        assert_eq!(
            q.find_parent_objects_without_child("^interface", r"speed\s\d+", false, &opts)
                .unwrap(),
            ids(&[1, 5])
        );
    }

    #[test]
    fn test_recurse_reaches_grandchildren() {
        let t = tree(&["router bgp 1", " neighbor a", "  remote-as 2", "router ospf 1"]);
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert!(q
            .find_parent_objects("^router", "remote-as", false, &opts)
            .unwrap()
            .is_empty());
        assert_eq!(
            q.find_parent_objects("^router", "remote-as", true, &opts).unwrap(),
            ids(&[0])
        );
        assert_eq!(
            q.find_parent_objects_without_child("^router", "remote-as", true, &opts)
                .unwrap(),
            ids(&[3])
        );
        assert_eq!(
            q.find_child_objects("^router bgp", "remote-as", true, &opts).unwrap(),
            ids(&[2])
        );
        assert!(q
            .find_child_objects("^router bgp", "remote-as", false, &opts)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_branches_drop_incomplete() {
        let t = tree(&["interface a", " shutdown", "interface b", " description x"]);
        let q = QueryEngine::new(&t);
        let branches = q
            .find_object_branches(&["interface", "shutdown"], &BranchOptions::new())
            .unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].nodes(), vec![Some(NodeId(0)), Some(NodeId(1))]);
    }

    #[test]
    fn test_branches_keep_empty_slots() {
        let t = tree(&["interface a", " shutdown", "interface b", " description x"]);
        let q = QueryEngine::new(&t);
        let branches = q
            .find_object_branches(
                &["interface", "shutdown", "never"],
                &BranchOptions::new().with_empty_branches(true),
            )
            .unwrap();
        assert_eq!(
            branches.iter().map(Branch::nodes).collect::<Vec<_>>(),
            vec![
                vec![Some(NodeId(0)), Some(NodeId(1)), None],
                vec![Some(NodeId(2)), None, None],
            ]
        );
        assert!(branches.iter().all(|b| b.len() == 3));
    }

    #[test]
    fn test_branches_without_seed() {
        let t = tree(&["hostname r1"]);
        let q = QueryEngine::new(&t);
        let opts = BranchOptions::new().with_empty_branches(true);
        let branches = q.find_object_branches(&["^interface", "x"], &opts).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].nodes(), vec![None, None]);
    }

    #[test]
    fn test_branches_fork_per_child() {
        let t = tree(&[
            "ltm pool FOO",
            "    members",
            "        k8s-05.localdomain:8443",
            "        k8s-06.localdomain:8443",
            "ltm pool BAR",
            "    members",
            "        k8s-07.localdomain:8443",
        ]);
        let q = QueryEngine::new(&t);
        let branches = q
            .find_object_branches(
                &[r"ltm\spool", r"members", r"\S+?:\d+"],
                &BranchOptions::new(),
            )
            .unwrap();
        assert_eq!(
            branches.iter().map(Branch::nodes).collect::<Vec<_>>(),
            vec![
                vec![Some(NodeId(0)), Some(NodeId(1)), Some(NodeId(2))],
                vec![Some(NodeId(0)), Some(NodeId(1)), Some(NodeId(3))],
                vec![Some(NodeId(4)), Some(NodeId(5)), Some(NodeId(6))],
            ]
        );

        let reversed = q
            .find_object_branches(
                &[r"ltm\spool", r"members", r"\S+?:\d+"],
                &BranchOptions::new().with_reverse(true),
            )
            .unwrap();
        assert_eq!(reversed.first(), branches.last());
    }

    #[test]
    fn test_branches_regex_groups() {
        let t = tree(&["interface Gi0/1", " ip address 10.0.0.1 255.255.255.0", " shutdown"]);
        let q = QueryEngine::new(&t);
        let branches = q
            .find_object_branches(
                &[r"^interface (\S+)", r"ip address (\S+) (\S+)"],
                &BranchOptions::new().with_regex_groups(true),
            )
            .unwrap();
        assert_eq!(
            branches[0].elements(),
            &[
                BranchElement::Captures(vec![Some("Gi0/1".to_string())]),
                BranchElement::Captures(vec![
                    Some("10.0.0.1".to_string()),
                    Some("255.255.255.0".to_string())
                ]),
            ]
        );

        let whole = q
            .find_object_branches(
                &[r"^interface", r"shutdown"],
                &BranchOptions::new().with_regex_groups(true),
            )
            .unwrap();
        assert_eq!(
            whole[0].get(1),
            Some(&BranchElement::Captures(vec![Some(" shutdown".to_string())]))
        );
    }

    #[test]
    fn test_branch_arguments_validated() {
        let t = tree(&["a"]);
        let q = QueryEngine::new(&t);
        assert!(matches!(
            q.find_object_branches(&[], &BranchOptions::new()),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            q.find_object_branches(&["a"], &BranchOptions::new()),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            q.find_object_branches(&["a", "("], &BranchOptions::new()),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_multi_pattern_parents_and_children() {
        let t = tree(&[
            "interfaces",
            "    ge-0/0/0",
            "        unit 0",
            "    ge-0/0/1",
            "        unit 0",
            "        unit 1",
            "vlans",
        ]);
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert_eq!(
            q.find_parent_objects_by_branch(&["^interfaces", r"ge-", "unit"], &opts)
                .unwrap(),
            ids(&[0])
        );
        assert_eq!(
            q.find_child_objects_by_branch(&["^interfaces", r"ge-", "unit"], &opts)
                .unwrap(),
            ids(&[2, 4, 5])
        );
        assert!(q
            .find_child_objects_by_branch(&["^vlans", "x"], &opts)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_stale_tree_rejects_queries() {
        let mut t = tree(&["hostname r1"]);
        t.append("interface x").unwrap();
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert!(q.find_objects("x", &opts).unwrap_err().is_stale());
        assert!(q
            .find_object_branches(&["a", "b"], &BranchOptions::new())
            .unwrap_err()
            .is_stale());
        assert!(q.config_hierarchy().unwrap_err().is_stale());
    }

    #[test]
    fn test_top_level_and_capture() {
        let t = tree(&["hostname r1", "ntp server 10.0.0.1", "interface x", " mtu 9000"]);
        let q = QueryEngine::new(&t);
        let opts = MatchOptions::new();
        assert!(q.find_top_level_objects("mtu", false, &opts).unwrap().is_empty());
        assert_eq!(q.find_top_level_objects("mtu", true, &opts).unwrap(), ids(&[3]));
        assert_eq!(
            q.capture_first::<String>(r"^hostname (\S+)", 1).unwrap(),
            Some("r1".to_string())
        );
        assert_eq!(q.capture_first::<u32>(r"mtu (\d+)", 1).unwrap(), None);
        assert!(q.capture_first::<u32>(r"^hostname (\S+)", 1).is_err());
    }

    #[test]
    fn test_re_search_children() {
        let t = tree(&[
            "router bgp 65000",
            " neighbor 10.0.0.1 remote-as 65001",
            " address-family ipv4",
            "  neighbor 10.0.0.1 activate",
            "hostname r1",
        ]);
        let q = QueryEngine::new(&t);
        assert_eq!(q.re_search_children(NodeId(0), "neighbor", false).unwrap(), ids(&[1]));
        assert_eq!(q.re_search_children(NodeId(0), "neighbor", true).unwrap(), ids(&[1, 3]));
        assert!(q.re_search_children(NodeId(4), ".", true).unwrap().is_empty());
        assert!(q.re_search_children(NodeId(42), ".", false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_re_match_iter_typed() {
        let t = tree(INTERFACES);
        let q = QueryEngine::new(&t);
        assert_eq!(
            q.re_match_iter_typed(NodeId(1), r"access vlan (\d+)", 1, false, 0u16).unwrap(),
            532
        );
        // The family's own line is tried first
        assert_eq!(
            q.re_match_iter_typed(NodeId(5), r"FastEthernet(\S+)", 1, false, String::new())
                .unwrap(),
            "0/2"
        );
        assert_eq!(
            q.re_match_iter_typed(NodeId(9), r"mtu (\d+)", 1, true, 1500u32).unwrap(),
            1500
        );
        assert!(q
            .re_match_iter_typed(NodeId(9), r"duplex (\S+)", 1, false, 0u32)
            .is_err());
        assert!(q
            .re_match_iter_typed(NodeId(9), r"duplex \S+", 1, false, String::new())
            .is_err());
    }

    #[test]
    fn test_family_queries_need_commit() {
        let mut t = tree(INTERFACES);
        t.append("interface FastEthernet0/4").unwrap();
        let q = QueryEngine::new(&t);
        assert!(q.re_search_children(NodeId(1), ".", false).unwrap_err().is_stale());
        assert!(q
            .re_match_iter_typed(NodeId(1), r"vlan (\d+)", 1, false, 0u16)
            .unwrap_err()
            .is_stale());
    }

    #[test]
    fn test_config_hierarchy() {
        let t = tree(&["!", "hostname r1", "interface x", " shutdown", "ntp master"]);
        let q = QueryEngine::new(&t);
        let (parents, leaves) = q.config_hierarchy().unwrap();
        assert_eq!(parents, ids(&[2]));
        assert_eq!(leaves, ids(&[1, 4]));
        assert_eq!(q.iter_config_lines().count(), 4);
    }
}
