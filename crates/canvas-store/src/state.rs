//! Observable canvas state

use canvas_content::NodeSource;
use canvas_model::{CanvasNode, Counters, NodeId, Pulse};
use indexmap::{IndexMap, IndexSet};

/// Transient advisory shown when an alias change was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// The alias that was refused
    pub alias: String,
}

impl Notice {
    /// Human-readable message
    #[must_use]
    pub fn message(&self) -> String {
        format!("Alias \u{201c}{}\u{201d} already exists", self.alias)
    }
}

/// Everything subscribers can observe
///
/// Only `nodes` and `counters` are persisted; the rest is session state.
/// `revision` increases on every change to the persisted part.
#[derive(Debug, Clone, Default)]
pub struct CanvasState {
    pub(crate) nodes: IndexMap<NodeId, CanvasNode>,
    pub(crate) counters: Counters,
    pub(crate) selected_node_id: Option<NodeId>,
    pub(crate) deleting: IndexSet<NodeId>,
    pub(crate) last_deleted: Option<CanvasNode>,
    pub(crate) notice: Option<Notice>,
    pub(crate) pulses: Vec<Pulse>,
    pub(crate) dark_mode: bool,
    pub(crate) revision: u64,
}

impl CanvasState {
    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &CanvasNode> {
        self.nodes.values()
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.nodes.get(id)
    }

    /// Node carrying `alias`
    #[must_use]
    pub fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode> {
        self.nodes.values().find(|node| node.alias() == alias)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node map keyed by id, in insertion order
    #[inline]
    #[must_use]
    pub fn node_map(&self) -> &IndexMap<NodeId, CanvasNode> {
        &self.nodes
    }

    /// Per-type creation counters
    #[inline]
    #[must_use]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Currently selected node
    #[inline]
    #[must_use]
    pub fn selected_node_id(&self) -> Option<&NodeId> {
        self.selected_node_id.as_ref()
    }

    /// Check if `id` is playing its exit animation
    #[inline]
    #[must_use]
    pub fn is_deleting(&self, id: &NodeId) -> bool {
        self.deleting.contains(id)
    }

    /// Nodes marked for deletion, in marking order
    pub fn deleting_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.deleting.iter()
    }

    /// Node held in the undo slot
    #[inline]
    #[must_use]
    pub fn last_deleted(&self) -> Option<&CanvasNode> {
        self.last_deleted.as_ref()
    }

    /// Active duplicate-alias notice
    #[inline]
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Live pulses, oldest first
    #[inline]
    #[must_use]
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Dark-mode preference
    #[inline]
    #[must_use]
    pub fn is_dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Revision of the persisted part
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl NodeSource for CanvasState {
    fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode> {
        CanvasState::node_by_alias(self, alias)
    }

    fn node_by_id(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.nodes.get(id)
    }
}
