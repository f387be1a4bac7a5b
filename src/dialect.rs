//! Configuration dialects.
//!
//! A dialect selects the line classifier table, the default comment markers,
//! the default indentation step, and whether the text is brace-delimited and
//! must be normalized before the hierarchy is built.

use crate::error::Error;
use serde::{Deserialize, Serialize};

// ============================================================================
// Dialect Tags
// ============================================================================

/// Supported configuration dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Cisco IOS/IOS-XE (default)
    #[default]
    Ios,
    /// Cisco NX-OS
    Nxos,
    /// Cisco IOS-XR
    Iosxr,
    /// Cisco ASA
    Asa,
    /// Juniper Junos and other brace-delimited configurations (F5, Palo Alto)
    Junos,
}

impl Dialect {
    /// All supported dialects, in tag order.
    pub const ALL: [Dialect; 5] = [
        Dialect::Ios,
        Dialect::Nxos,
        Dialect::Iosxr,
        Dialect::Asa,
        Dialect::Junos,
    ];

    /// The lowercase tag used in settings files and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Ios => "ios",
            Dialect::Nxos => "nxos",
            Dialect::Iosxr => "iosxr",
            Dialect::Asa => "asa",
            Dialect::Junos => "junos",
        }
    }

    /// Comment markers used when the caller does not supply any.
    pub fn default_comment_markers(&self) -> Vec<char> {
        match self {
            Dialect::Junos => vec!['#'],
            _ => vec!['!'],
        }
    }

    /// Indentation width of one hierarchy level.
    pub fn default_indent_step(&self) -> usize {
        match self {
            Dialect::Ios | Dialect::Asa | Dialect::Iosxr => 1,
            Dialect::Nxos => 2,
            Dialect::Junos => 4,
        }
    }

    /// Brace dialects always flow through the brace normalizer.
    pub fn is_brace_delimited(&self) -> bool {
        matches!(self, Dialect::Junos)
    }

    /// Whether delimiter-bounded banners are linked after bootstrap.
    pub fn has_banners(&self) -> bool {
        !self.is_brace_delimited()
    }

    /// Whether `macro name` blocks terminated by `@` are linked after bootstrap.
    pub fn has_macros(&self) -> bool {
        matches!(self, Dialect::Ios)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ios" | "cisco_ios" | "ios_xe" | "iosxe" => Ok(Dialect::Ios),
            "nxos" | "nx_os" | "cisco_nxos" | "nexus" => Ok(Dialect::Nxos),
            "iosxr" | "cisco_iosxr" | "ios_xr" => Ok(Dialect::Iosxr),
            "asa" | "cisco_asa" => Ok(Dialect::Asa),
            "junos" | "juniper_junos" | "juniper" => Ok(Dialect::Junos),
            _ => Err(Error::UnsupportedDialect(s.to_string())),
        }
    }
}
