//! Tokio driver for a live store
//!
//! The session owns the receiving end of the timer channel and applies
//! fired events to the shared store, one at a time, until shut down.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::persistence::KeyValueStore;
use crate::scheduler::{Scheduler, TimerEvent, TokioScheduler};
use crate::store::CanvasStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Store shared between the session loop and its callers
pub type SharedStore = Arc<Mutex<CanvasStore>>;

/// A hydrated store wired to tokio timers
#[derive(Debug)]
pub struct CanvasSession {
    store: SharedStore,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    shutdown: CancellationToken,
}

impl CanvasSession {
    /// Hydrate a store from `storage` on the current runtime
    ///
    /// # Errors
    /// Returns [`StoreError::NoRuntime`] when called outside a tokio runtime
    pub fn open(config: StoreConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let (scheduler, events) = TokioScheduler::new()?;
        let scheduler: Arc<dyn Scheduler> = Arc::new(scheduler);
        let store = CanvasStore::hydrate(config, scheduler, storage);
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            events,
            shutdown: CancellationToken::new(),
        })
    }

    /// Handle to the store
    #[must_use]
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// Token that stops [`run`](Self::run) when cancelled
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Apply timer events until shutdown, then flush a pending autosave
    ///
    /// # Errors
    /// Returns error if the final flush fails
    pub async fn run(mut self) -> Result<(), StoreError> {
        tracing::info!("canvas session started");
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => {
                        tracing::trace!("timer fired: {:?}", event);
                        self.store.lock().handle_timer(event);
                    }
                    None => break,
                },
            }
        }
        let flushed = self.store.lock().flush_autosave()?;
        tracing::info!("canvas session stopped (flushed pending save: {})", flushed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use canvas_model::NodeKind;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn session_applies_timers_and_flushes_on_shutdown() {
        let storage = Arc::new(MemoryStore::new());
        let session = CanvasSession::open(StoreConfig::default(), storage.clone()).unwrap();
        let store = session.store();
        let shutdown = session.shutdown_token();
        let task = tokio::spawn(session.run());

        let id = store.lock().add_node(NodeKind::Content, None);
        store.lock().mark_node_for_deletion(&id);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(store.lock().node(&id).is_none());
        assert!(store.lock().state().last_deleted().is_some());

        // removal restarted the quiet period; stop before it ends
        shutdown.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(storage.writes(), 1);
        assert!(storage.get("canvas-storage").unwrap().is_some());
    }

    #[test]
    fn open_requires_a_runtime() {
        let result = CanvasSession::open(StoreConfig::default(), Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(StoreError::NoRuntime(_))));
    }
}
