//! Vendor line classification.
//!
//! Each dialect owns an ordered table of `(predicate, kind)` rows. The first
//! row whose predicate accepts the raw line text decides the line's
//! [`LineKind`]; the catch-all row is always last, so row order matters.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::node::LineNode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Line Kinds
// ============================================================================

/// Vendor kind tag attached to every line node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// `interface ...`
    Interface,
    /// `ip route ...` / `ipv6 route ...`
    StaticRoute,
    /// `line vty ...`, `line con ...`
    AccessLine,
    /// Global statements that affect every interface
    InterfaceGlobal,
    /// NX-OS `vpc domain ...`
    VpcDomain,
    Hostname,
    /// ASA `name <addr> <name>`
    Name,
    ObjectNetwork,
    ObjectService,
    ObjectGroupNetwork,
    ObjectGroupService,
    AccessList,
    /// Anything no specific row claimed
    #[default]
    Generic,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Interface => "interface",
            LineKind::StaticRoute => "static_route",
            LineKind::AccessLine => "access_line",
            LineKind::InterfaceGlobal => "interface_global",
            LineKind::VpcDomain => "vpc_domain",
            LineKind::Hostname => "hostname",
            LineKind::Name => "name",
            LineKind::ObjectNetwork => "object_network",
            LineKind::ObjectService => "object_service",
            LineKind::ObjectGroupNetwork => "object_group_network",
            LineKind::ObjectGroupService => "object_group_service",
            LineKind::AccessList => "access_list",
            LineKind::Generic => "generic",
        }
    }
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Predicates
// ============================================================================

type Predicate = fn(&str) -> bool;

static IOS_INTERFACE_GLOBAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(no\s+cdp\s+run)|(logging\s+event\s+link-status\s+global)|(spanning-tree\sportfast\sdefault)|(spanning-tree\sportfast\sbpduguard\sdefault)",
    )
    .expect("Invalid interface-global regex")
});

static VPC_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^vpc\s+domain").expect("Invalid vpc domain regex"));

static ASA_INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^interface\s+(\S+.+)").expect("Invalid interface regex"));

/// `interface` as the first word at column 0.
fn is_interface(line: &str) -> bool {
    line.strip_prefix("interface")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn is_static_route(line: &str) -> bool {
    line.starts_with("ip route ") || line.starts_with("ipv6 route ")
}

fn is_access_line(line: &str) -> bool {
    line.starts_with("line")
}

fn is_ios_interface_global(line: &str) -> bool {
    IOS_INTERFACE_GLOBAL.is_match(line)
}

fn is_vpc_domain(line: &str) -> bool {
    VPC_DOMAIN.is_match(line)
}

fn is_hostname(line: &str) -> bool {
    line.starts_with("hostname")
}

/// Case-insensitive prefix test over the first `prefix.len()` bytes.
fn has_prefix_ignore_case(line: &str, prefix: &str) -> bool {
    line.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

fn is_asa_interface(line: &str) -> bool {
    ASA_INTERFACE.is_match(line)
}

fn is_asa_name(line: &str) -> bool {
    has_prefix_ignore_case(line, "name ")
}

fn is_asa_object_network(line: &str) -> bool {
    has_prefix_ignore_case(line, "object network ")
}

fn is_asa_object_service(line: &str) -> bool {
    has_prefix_ignore_case(line, "object service ")
}

fn is_asa_object_group_network(line: &str) -> bool {
    has_prefix_ignore_case(line, "object-group network ")
}

fn is_asa_object_group_service(line: &str) -> bool {
    has_prefix_ignore_case(line, "object-group service ")
}

fn is_asa_interface_global(line: &str) -> bool {
    line.starts_with("mtu")
}

fn is_asa_access_list(line: &str) -> bool {
    has_prefix_ignore_case(line, "access-list ")
}

fn is_anything(_line: &str) -> bool {
    true
}

// ============================================================================
// Dialect Tables
// ============================================================================

const IOS_TABLE: &[(Predicate, LineKind)] = &[
    (is_interface, LineKind::Interface),
    (is_static_route, LineKind::StaticRoute),
    (is_access_line, LineKind::AccessLine),
    (is_ios_interface_global, LineKind::InterfaceGlobal),
    (is_anything, LineKind::Generic),
];

const NXOS_TABLE: &[(Predicate, LineKind)] = &[
    (is_interface, LineKind::Interface),
    (is_static_route, LineKind::StaticRoute),
    (is_access_line, LineKind::AccessLine),
    (is_vpc_domain, LineKind::VpcDomain),
    (is_hostname, LineKind::Hostname),
    (is_ios_interface_global, LineKind::InterfaceGlobal),
    (is_anything, LineKind::Generic),
];

const IOSXR_TABLE: &[(Predicate, LineKind)] = &[
    (is_interface, LineKind::Interface),
    (is_anything, LineKind::Generic),
];

const ASA_TABLE: &[(Predicate, LineKind)] = &[
    (is_asa_interface, LineKind::Interface),
    (is_asa_name, LineKind::Name),
    (is_asa_object_network, LineKind::ObjectNetwork),
    (is_asa_object_service, LineKind::ObjectService),
    (is_asa_object_group_network, LineKind::ObjectGroupNetwork),
    (is_asa_object_group_service, LineKind::ObjectGroupService),
    (is_asa_interface_global, LineKind::InterfaceGlobal),
    (is_hostname, LineKind::Hostname),
    (is_asa_access_list, LineKind::AccessList),
    (is_anything, LineKind::Generic),
];

const JUNOS_TABLE: &[(Predicate, LineKind)] = &[(is_anything, LineKind::Generic)];

fn table_for(dialect: Dialect) -> &'static [(Predicate, LineKind)] {
    match dialect {
        Dialect::Ios => IOS_TABLE,
        Dialect::Nxos => NXOS_TABLE,
        Dialect::Iosxr => IOSXR_TABLE,
        Dialect::Asa => ASA_TABLE,
        Dialect::Junos => JUNOS_TABLE,
    }
}

/// Kind of a raw line under `dialect`.
pub fn classify_kind(dialect: Dialect, line: &str) -> LineKind {
    table_for(dialect)
        .iter()
        .find(|(accepts, _)| accepts(line))
        .map(|(_, kind)| *kind)
        .unwrap_or_default()
}

// ============================================================================
// Classifier
// ============================================================================

/// Turns raw lines into unlinked [`LineNode`]s for one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    dialect: Dialect,
    comment_markers: Vec<char>,
}

impl Classifier {
    /// Create a classifier; `None` markers fall back to the dialect default.
    pub fn new(dialect: Dialect, comment_markers: Option<Vec<char>>) -> Result<Self> {
        let comment_markers = comment_markers.unwrap_or_else(|| dialect.default_comment_markers());
        if comment_markers.is_empty() {
            return Err(Error::invalid_arguments(
                "at least one comment marker is required",
            ));
        }
        if let Some(bad) = comment_markers.iter().find(|c| c.is_whitespace()) {
            return Err(Error::invalid_arguments(format!(
                "comment marker {:?} cannot be whitespace",
                bad
            )));
        }
        Ok(Self {
            dialect,
            comment_markers,
        })
    }

    /// Create a classifier from a textual dialect tag such as `"nxos"`.
    pub fn from_tag(tag: &str, comment_markers: Option<Vec<char>>) -> Result<Self> {
        Self::new(tag.parse()?, comment_markers)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn comment_markers(&self) -> &[char] {
        &self.comment_markers
    }

    /// True when the first non-whitespace character is a comment marker.
    pub fn is_comment(&self, line: &str) -> bool {
        line.trim_start()
            .chars()
            .next()
            .map(|c| self.comment_markers.contains(&c))
            .unwrap_or(false)
    }

    /// Build the node for one raw line. Links are left empty.
    pub fn classify(&self, line: &str, line_number: usize) -> LineNode {
        let mut node = LineNode::new(line, line_number, classify_kind(self.dialect, line));
        node.is_comment = self.is_comment(line);
        node
    }
}
