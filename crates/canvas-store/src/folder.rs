//! Folder containment
//!
//! A containable node belongs to at most one folder; folders never contain
//! themselves or other folders.

use crate::store::CanvasStore;
use canvas_model::{FolderColor, FolderData, NodeData, NodeId, NodeKind, Position};
use std::collections::HashSet;

impl CanvasStore {
    fn folder_mut(&mut self, folder_id: &NodeId) -> Option<&mut FolderData> {
        self.state.nodes.get_mut(folder_id)?.data.as_folder_mut()
    }

    /// Check if `node_id` may be placed in a folder under the current policy
    #[must_use]
    pub fn is_containable(&self, node_id: &NodeId) -> bool {
        self.state
            .nodes
            .get(node_id)
            .is_some_and(|node| self.config.is_containable(node.kind()))
    }

    /// Append a node to a folder
    ///
    /// No-op if either id is unknown, `folder_id` is not a folder, the node
    /// is not containable, or it already belongs to a folder.
    pub fn add_node_to_folder(&mut self, folder_id: &NodeId, node_id: &NodeId) -> bool {
        if folder_id == node_id || !self.is_containable(node_id) {
            return false;
        }
        if self.get_folder_for_node(node_id).is_some() {
            return false;
        }
        let Some(folder) = self.folder_mut(folder_id) else {
            return false;
        };
        folder.child_node_ids.push(node_id.clone());
        tracing::debug!("added {} to folder {}", node_id, folder_id);
        self.commit();
        true
    }

    /// Take a node out of a folder; the node itself stays on the canvas
    pub fn remove_node_from_folder(&mut self, folder_id: &NodeId, node_id: &NodeId) -> bool {
        let Some(folder) = self.folder_mut(folder_id) else {
            return false;
        };
        let before = folder.child_node_ids.len();
        folder.child_node_ids.retain(|child| child != node_id);
        if folder.child_node_ids.len() == before {
            return false;
        }
        self.commit();
        true
    }

    /// Reorder a folder's children
    ///
    /// Ids that are not current children are ignored and current children
    /// missing from `ordered` keep their relative order at the end, so the
    /// set of children never changes.
    pub fn reorder_folder_children(&mut self, folder_id: &NodeId, ordered: &[NodeId]) -> bool {
        let Some(folder) = self.folder_mut(folder_id) else {
            return false;
        };
        let current: HashSet<&NodeId> = folder.child_node_ids.iter().collect();
        let mut seen = HashSet::new();
        let mut next: Vec<NodeId> = ordered
            .iter()
            .filter(|id| current.contains(id) && seen.insert((*id).clone()))
            .cloned()
            .collect();
        next.extend(
            folder
                .child_node_ids
                .iter()
                .filter(|id| !seen.contains(*id))
                .cloned(),
        );
        if next == folder.child_node_ids {
            return false;
        }
        folder.child_node_ids = next;
        self.commit();
        true
    }

    /// Flip a folder between expanded and collapsed; returns the new state
    pub fn toggle_folder_expanded(&mut self, folder_id: &NodeId) -> Option<bool> {
        let folder = self.folder_mut(folder_id)?;
        folder.is_expanded = !folder.is_expanded;
        let expanded = folder.is_expanded;
        self.commit();
        Some(expanded)
    }

    /// Folder that contains `node_id`
    #[must_use]
    pub fn get_folder_for_node(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.state.nodes.values().find_map(|node| {
            node.data
                .as_folder()
                .filter(|folder| folder.child_node_ids.contains(node_id))
                .map(|_| &node.id)
        })
    }

    /// Recolor a folder
    pub fn set_folder_color(&mut self, folder_id: &NodeId, color: FolderColor) -> bool {
        let Some(folder) = self.folder_mut(folder_id) else {
            return false;
        };
        if folder.color == color {
            return true;
        }
        folder.color = color;
        self.commit();
        true
    }

    /// Delete a folder, leaving its children on the canvas at top level
    pub fn ungroup_folder(&mut self, folder_id: &NodeId) -> bool {
        let Some(folder) = self.folder_mut(folder_id) else {
            return false;
        };
        let released = std::mem::take(&mut folder.child_node_ids);
        self.detach_node(folder_id);
        tracing::debug!("ungrouped folder {}, released {} nodes", folder_id, released.len());
        self.commit();
        true
    }

    /// Create a folder holding `node_id` as its only child
    ///
    /// A node already inside another folder is moved. Returns `None` if the
    /// node is unknown or not containable.
    ///
    /// # Arguments
    /// * `node_id` - node to wrap
    /// * `position` - folder position, the node's position when `None`
    pub fn create_folder_with_node(&mut self, node_id: &NodeId, position: Option<Position>) -> Option<NodeId> {
        if !self.is_containable(node_id) {
            return None;
        }
        let position = position.or_else(|| self.state.nodes.get(node_id).map(|node| node.position));

        for node in self.state.nodes.values_mut() {
            if let Some(folder) = node.data.as_folder_mut() {
                folder.child_node_ids.retain(|child| child != node_id);
            }
        }

        let alias = self.allocate_alias(NodeKind::Folder);
        let mut data = NodeData::new_default(NodeKind::Folder, alias);
        if let Some(folder) = data.as_folder_mut() {
            folder.child_node_ids.push(node_id.clone());
        }
        Some(self.insert_new(position, data))
    }

    /// Repair folder children after a bulk change
    ///
    /// Drops unknown ids, self references, folders and ids already claimed
    /// by an earlier folder. Returns whether anything changed.
    pub(crate) fn normalize_folders(&mut self) -> bool {
        let folders: HashSet<NodeId> = self
            .state
            .nodes
            .values()
            .filter(|node| node.kind() == NodeKind::Folder)
            .map(|node| node.id.clone())
            .collect();
        let known: HashSet<NodeId> = self.state.nodes.keys().cloned().collect();

        let mut claimed = HashSet::new();
        let mut changed = false;
        for node in self.state.nodes.values_mut() {
            let own = node.id.clone();
            let Some(folder) = node.data.as_folder_mut() else {
                continue;
            };
            let before = folder.child_node_ids.len();
            folder.child_node_ids.retain(|child| {
                *child != own
                    && known.contains(child)
                    && !folders.contains(child)
                    && claimed.insert(child.clone())
            });
            if folder.child_node_ids.len() != before {
                tracing::warn!(
                    "folder {} dropped {} invalid children",
                    own,
                    before - folder.child_node_ids.len()
                );
                changed = true;
            }
        }
        changed
    }
}
