//! The persisted canvas document

use crate::kind::NodeKind;
use crate::node::CanvasNode;
use serde::{Deserialize, Serialize};

/// Schema version written by this crate
///
/// Version 1 blobs carry no `version` field.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Per-type creation counters
///
/// A counter is only the starting point for the next alias suffix; the
/// allocator still skips past any alias already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Counters {
    pub generator: u64,
    pub content: u64,
    pub component: u64,
    pub data2ui: u64,
    pub iframe: u64,
    pub folder: u64,
}

impl Counters {
    /// Counter for `kind`
    #[must_use]
    pub fn get(&self, kind: NodeKind) -> u64 {
        match kind {
            NodeKind::Generator => self.generator,
            NodeKind::Content => self.content,
            NodeKind::Component => self.component,
            NodeKind::Data2Ui => self.data2ui,
            NodeKind::Iframe => self.iframe,
            NodeKind::Folder => self.folder,
        }
    }

    /// Set the counter for `kind`
    pub fn set(&mut self, kind: NodeKind, value: u64) {
        let slot = match kind {
            NodeKind::Generator => &mut self.generator,
            NodeKind::Content => &mut self.content,
            NodeKind::Component => &mut self.component,
            NodeKind::Data2Ui => &mut self.data2ui,
            NodeKind::Iframe => &mut self.iframe,
            NodeKind::Folder => &mut self.folder,
        };
        *slot = value;
    }
}

/// Versioned snapshot of the canvas: every node plus the counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Schema version
    pub version: u32,
    /// Nodes in insertion order
    pub nodes: Vec<CanvasNode>,
    /// Per-type creation counters
    #[serde(default)]
    pub counters: Counters,
}

impl CanvasDocument {
    /// Document at the current schema version
    #[inline]
    #[must_use]
    pub fn new(nodes: Vec<CanvasNode>, counters: Counters) -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            nodes,
            counters,
        }
    }
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new(Vec::new(), Counters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counters_default_missing_kinds() {
        let counters: Counters = serde_json::from_value(json!({"generator": 3})).unwrap();
        assert_eq!(counters.get(NodeKind::Generator), 3);
        assert_eq!(counters.get(NodeKind::Folder), 0);
    }

    #[test]
    fn counters_set_by_kind() {
        let mut counters = Counters::default();
        for (i, kind) in NodeKind::ALL.into_iter().enumerate() {
            counters.set(kind, i as u64 + 1);
        }
        assert_eq!(counters.data2ui, 4);
        assert_eq!(counters.iframe, 5);
    }

    #[test]
    fn empty_document_is_current_version() {
        let doc = CanvasDocument::default();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["version"], CURRENT_SCHEMA_VERSION);
        assert_eq!(value["nodes"], json!([]));
    }
}
