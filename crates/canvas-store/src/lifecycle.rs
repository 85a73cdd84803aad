//! Two-phase deletion with a single-slot undo buffer
//!
//! `mark_node_for_deletion` only flags the node; the node leaves the
//! collection when the grace timer fires. The removed node then sits in the
//! undo slot until the undo window closes or a newer deletion replaces it.

use crate::scheduler::TimerEvent;
use crate::store::CanvasStore;
use canvas_alias::{is_alias_unique, next_alias};
use canvas_model::NodeId;

impl CanvasStore {
    /// Flag a node for deletion and schedule its removal after the grace
    /// period
    ///
    /// Returns `false` if the node does not exist or is already marked.
    pub fn mark_node_for_deletion(&mut self, id: &NodeId) -> bool {
        if !self.state.nodes.contains_key(id) || self.state.deleting.contains(id) {
            return false;
        }
        self.state.deleting.insert(id.clone());
        let handle = self.scheduler.schedule(
            self.config.deletion_grace(),
            TimerEvent::FinalizeDeletion { node_id: id.clone() },
        );
        self.timers.deletions.insert(id.clone(), handle);
        tracing::debug!("marked {} for deletion", id);
        self.notify();
        true
    }

    /// Remove a marked node and move it into the undo slot
    pub(crate) fn finalize_deletion(&mut self, id: &NodeId) {
        if !self.state.deleting.contains(id) {
            return;
        }
        let Some(node) = self.detach_node(id) else {
            return;
        };
        tracing::info!("deleted node {} ('{}')", id, node.alias());

        if let Some(handle) = self.timers.undo.take() {
            handle.cancel();
        }
        self.timers.undo_epoch += 1;
        let epoch = self.timers.undo_epoch;
        self.timers.undo = Some(
            self.scheduler
                .schedule(self.config.undo_window(), TimerEvent::UndoExpired { epoch }),
        );
        self.state.last_deleted = Some(node);
        self.commit();
    }

    pub(crate) fn expire_undo(&mut self, epoch: u64) {
        if epoch != self.timers.undo_epoch {
            return;
        }
        self.timers.undo = None;
        if self.state.last_deleted.take().is_some() {
            tracing::debug!("undo window closed");
            self.notify();
        }
    }

    /// Put the most recently deleted node back
    ///
    /// The node keeps its id, position and payload. If another node took its
    /// alias in the meantime, a fresh alias is allocated. Returns the
    /// restored id, or `None` when the slot is empty.
    pub fn undo_delete(&mut self) -> Option<NodeId> {
        let mut node = self.state.last_deleted.take()?;
        self.clear_undo_slot();

        if self.state.nodes.contains_key(&node.id) {
            tracing::warn!("cannot restore {}: id is in use", node.id);
            self.notify();
            return None;
        }
        if !is_alias_unique(self.state.nodes.values(), node.alias(), None) {
            let kind = node.kind();
            let allocated = next_alias(self.state.nodes.values(), kind, self.state.counters.get(kind));
            tracing::warn!(
                "alias '{}' was taken, restored node {} as '{}'",
                node.alias(),
                node.id,
                allocated.alias
            );
            self.state.counters.set(kind, allocated.suffix);
            node.data.set_alias(allocated.alias);
        }

        let id = node.id.clone();
        self.state.nodes.insert(id.clone(), node);
        self.normalize_folders();
        tracing::info!("restored node {}", id);
        self.commit();
        Some(id)
    }

    /// Empty the undo slot without restoring anything
    pub fn clear_undo_state(&mut self) {
        let had = self.state.last_deleted.is_some();
        self.clear_undo_slot();
        if had {
            self.notify();
        }
    }

    pub(crate) fn clear_undo_slot(&mut self) {
        if let Some(handle) = self.timers.undo.take() {
            handle.cancel();
        }
        self.timers.undo_epoch += 1;
        self.state.last_deleted = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::persistence::MemoryStore;
    use crate::scheduler::ManualScheduler;
    use crate::store::CanvasStore;
    use canvas_model::{NodeKind, Position};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> (CanvasStore, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let store = CanvasStore::new(StoreConfig::default(), scheduler.clone(), Arc::new(MemoryStore::new()));
        (store, scheduler)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn node_stays_until_grace_period_ends() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, None);
        assert!(store.mark_node_for_deletion(&id));
        assert!(!store.mark_node_for_deletion(&id));
        assert!(store.state().is_deleting(&id));

        scheduler.advance(ms(299), |e| store.handle_timer(e));
        assert!(store.node(&id).is_some());
        scheduler.advance(ms(1), |e| store.handle_timer(e));
        assert!(store.node(&id).is_none());
        assert!(!store.state().is_deleting(&id));
        assert_eq!(store.state().last_deleted().map(|n| n.id.clone()), Some(id));
    }

    #[test]
    fn undo_restores_verbatim() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, Some(Position::new(7.0, 8.0)));
        let original = store.node(&id).cloned().unwrap();
        store.mark_node_for_deletion(&id);
        scheduler.advance(ms(300), |e| store.handle_timer(e));

        assert_eq!(store.undo_delete(), Some(id.clone()));
        assert_eq!(store.node(&id), Some(&original));
        assert!(store.state().last_deleted().is_none());
        assert_eq!(store.undo_delete(), None);
    }

    #[test]
    fn undo_expires_after_window() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, None);
        store.mark_node_for_deletion(&id);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        scheduler.advance(ms(5_000), |e| store.handle_timer(e));
        assert!(store.state().last_deleted().is_none());
        assert_eq!(store.undo_delete(), None);
    }

    #[test]
    fn newer_deletion_resets_the_window() {
        let (mut store, scheduler) = store();
        let a = store.add_node(NodeKind::Content, None);
        let b = store.add_node(NodeKind::Content, None);
        store.mark_node_for_deletion(&a);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        scheduler.advance(ms(4_000), |e| store.handle_timer(e));
        store.mark_node_for_deletion(&b);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        // first window would have closed here
        scheduler.advance(ms(1_000), |e| store.handle_timer(e));

        assert_eq!(store.state().last_deleted().map(|n| n.id.clone()), Some(b.clone()));
        assert_eq!(store.undo_delete(), Some(b));
        assert!(store.node(&a).is_none());
    }

    #[test]
    fn undo_reallocates_a_taken_alias() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, None);
        store.mark_node_for_deletion(&id);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        let other = store.add_node(NodeKind::Generator, None);
        store.rename_node(&other, "con-1");

        store.undo_delete().unwrap();
        assert_eq!(store.node(&id).unwrap().alias(), "con-2");
    }

    #[test]
    fn removal_during_grace_cancels_finalization() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, None);
        store.mark_node_for_deletion(&id);
        store.remove_node(&id);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        assert!(store.state().last_deleted().is_none());
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn clear_undo_state_drops_the_slot() {
        let (mut store, scheduler) = store();
        let id = store.add_node(NodeKind::Content, None);
        store.mark_node_for_deletion(&id);
        scheduler.advance(ms(300), |e| store.handle_timer(e));
        store.clear_undo_state();
        assert!(store.state().last_deleted().is_none());
        assert_eq!(store.undo_delete(), None);
        assert!(store.node(&id).is_none());
    }
}
