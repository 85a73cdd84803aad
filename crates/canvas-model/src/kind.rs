//! Node type discriminant

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type of a canvas node
///
/// Serialized with the same names the persisted document uses for the
/// `type` tag of node payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Prompt generator box
    Generator,
    /// Text or file content box
    Content,
    /// Rendered component box
    Component,
    /// Data exporter box
    #[serde(rename = "data2ui")]
    Data2Ui,
    /// Embedded URL box
    Iframe,
    /// Grouping folder
    Folder,
}

impl NodeKind {
    /// Every kind, in declaration order
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Generator,
        NodeKind::Content,
        NodeKind::Component,
        NodeKind::Data2Ui,
        NodeKind::Iframe,
        NodeKind::Folder,
    ];

    /// Fixed alias prefix for nodes of this kind
    #[inline]
    #[must_use]
    pub fn alias_prefix(self) -> &'static str {
        match self {
            NodeKind::Generator => "output",
            NodeKind::Content => "con",
            NodeKind::Component => "comp",
            NodeKind::Data2Ui => "data2ui",
            NodeKind::Iframe => "iframe",
            NodeKind::Folder => "folder",
        }
    }

    /// Stable lower-case name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Generator => "generator",
            NodeKind::Content => "content",
            NodeKind::Component => "component",
            NodeKind::Data2Ui => "data2ui",
            NodeKind::Iframe => "iframe",
            NodeKind::Folder => "folder",
        }
    }

    /// Human label used in autocomplete entries
    #[inline]
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            NodeKind::Generator => "Generator",
            NodeKind::Content => "Content",
            NodeKind::Component => "Component",
            NodeKind::Data2Ui => "Data2UI",
            NodeKind::Iframe => "Iframe",
            NodeKind::Folder => "Folder",
        }
    }

    /// Check if this kind is a folder
    #[inline]
    #[must_use]
    pub fn is_folder(self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}
