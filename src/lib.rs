//! # confparse - Network Device Configuration Parser
//!
//! confparse reads whitespace-indented and brace-delimited network device
//! configurations into an ordered hierarchy of line nodes, then lets you
//! search and edit that hierarchy.
//!
//! ## Core Concepts
//!
//! - **Dialects**: IOS, NX-OS, IOS-XR, ASA and Junos select comment markers,
//!   indentation defaults and the line classifier table
//! - **Line nodes**: one statement each, linked to a parent and children by
//!   indentation, or by delimiters for banners and macros
//! - **Checkpoints**: a fingerprint of the node sequence; queries refuse to
//!   run on a tree edited since its last commit
//! - **Branches**: one path through the hierarchy per pattern sequence,
//!   found breadth-first one level at a time
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  ConfigDocument (options, I/O)                       │
//! └─────────────────────────────────────────────────────────────────────┘
//!                │ brace dialects                    │
//!                ▼                                   │
//! ┌─────────────────────────────┐                    │
//! │       BraceNormalizer       │                    │
//! └─────────────────────────────┘                    │
//!                │                                   ▼
//!                └──────────────►┌─────────────────────────────────────┐
//!                                │ ConfigTree (Classifier, LineNode)    │
//!                                └─────────────────────────────────────┘
//!                                                    │
//!                                                    ▼
//!                                ┌─────────────────────────────────────┐
//!                                │            QueryEngine               │
//!                                └─────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```
//! use confparse::prelude::*;
//!
//! let text = "interface Gi1/1\n ip address 10.0.0.1 255.255.255.0\n shutdown\n\
//!             interface Gi1/2\n ip address 10.0.1.1 255.255.255.0\n";
//! let doc = ConfigDocument::parse(text, ParseOptions::new(Dialect::Ios))?;
//!
//! let branches = doc.find_object_branches(&["^interface", "shutdown"], &BranchOptions::default())?;
//! assert_eq!(branches.len(), 1);
//! assert_eq!(branches[0].len(), 2);
//! # Ok::<(), confparse::Error>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.
    //!
    //! ```
    //! use confparse::prelude::*;
    //!
    //! let mut doc = ConfigDocument::new(ParseOptions::new(Dialect::Nxos))?;
    //! doc.append("feature bgp")?;
    //! doc.commit();
    //! assert!(doc.search_safe());
    //! # Ok::<(), confparse::Error>(())
    //! ```

    pub use crate::brace::{BraceNormalizer, NormalizedLine};
    pub use crate::classify::{Classifier, LineKind};
    pub use crate::config::{ParseOptions, Settings};
    pub use crate::dialect::Dialect;
    pub use crate::document::ConfigDocument;
    pub use crate::error::{Error, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingBuilder, LoggingConfig};
    pub use crate::node::{LineNode, NodeId};
    pub use crate::query::{Branch, BranchElement, BranchOptions, MatchOptions, QueryEngine};
    pub use crate::tree::ConfigTree;
}

// ============================================================================
// Core
// ============================================================================

/// Error types and the crate `Result` alias.
pub mod error;

/// Supported dialects and their defaults.
pub mod dialect;

/// Per-dialect line classification.
pub mod classify;

/// Line nodes and arena handles.
pub mod node;

/// Brace-to-indent normalization.
pub mod brace;

/// Hierarchy construction, checkpoints and mutation.
pub mod tree;

/// Single-pattern, parent/child and branch search.
pub mod query;

/// Document façade: options, loading and saving.
pub mod document;

// ============================================================================
// Ambient
// ============================================================================

/// Layered settings loading.
pub mod config;

/// Tracing subscriber setup.
pub mod logging;

pub use document::ConfigDocument;
pub use error::{Error, Result};

/// Returns the current version of confparse.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
