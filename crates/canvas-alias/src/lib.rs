//! Canvas Alias
//!
//! Name-based references between canvas boxes.
//!
//! # Core Concepts
//!
//! - **Tokens**: `@alias` references scanned with one shared grammar
//! - **AliasMap**: alias → node id, type and flattened value, rebuilt on demand
//! - **Allocation**: `<prefix>-<n>` aliases that stay unique across every type
//! - **Options**: labelled autocomplete entries with case-insensitive filtering
//!
//! # Example
//!
//! ```rust
//! use canvas_alias::{next_alias, AliasMap};
//! use canvas_model::{CanvasNode, NodeData, NodeId, NodeKind, Position};
//!
//! let allocated = next_alias(std::iter::empty(), NodeKind::Content, 0);
//! let node = CanvasNode::new(
//!     NodeId::new("node-1"),
//!     Position::default(),
//!     NodeData::new_default(NodeKind::Content, allocated.alias),
//! );
//!
//! let map = AliasMap::build([&node]);
//! assert!(map.contains("con-1"));
//! assert_eq!(map.resolve_all_aliases("see @missing"), "see @missing");
//! ```

#![warn(unreachable_pub)]

mod allocate;
mod error;
mod index;
mod options;
pub mod token;

// Re-exports
pub use allocate::{is_alias_unique, next_alias, validate_alias, AllocatedAlias};
pub use error::AliasError;
pub use index::{alias_value, AliasEntry, AliasMap};
pub use options::{alias_options, filter_aliases, AliasOption};
pub use token::{segments, tokens, AliasToken, Segment};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for alias resolution
    pub use crate::{is_alias_unique, next_alias, AliasEntry, AliasMap, AliasOption, Segment};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
