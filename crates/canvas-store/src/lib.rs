//! Canvas Store
//!
//! The single writer of canvas state: node collection, folder containment,
//! deletion with undo and debounced persistence.
//!
//! # Core Concepts
//!
//! - **CanvasStore**: applies every mutation synchronously and notifies
//!   selector subscriptions afterwards
//! - **Scheduler**: the timer port; [`ManualScheduler`] advances virtual
//!   time, [`TokioScheduler`] uses real timers
//! - **KeyValueStore**: the durability port behind save, load and the
//!   dark-mode flag
//! - **Lifecycle**: deletion is flagged first, finalized after a grace
//!   period, and undoable for a fixed window
//! - **Autosave**: every change to the persisted part restarts a quiet
//!   period; one write follows it
//!
//! # Example
//!
//! ```rust
//! use canvas_model::NodeKind;
//! use canvas_store::{CanvasStore, ManualScheduler, MemoryStore, StoreConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let storage = Arc::new(MemoryStore::new());
//! let mut store = CanvasStore::new(StoreConfig::default(), scheduler.clone(), storage.clone());
//!
//! let id = store.add_node(NodeKind::Content, None);
//! assert_eq!(store.node(&id).map(|n| n.alias()), Some("con-1"));
//!
//! scheduler.advance(Duration::from_secs(1), |event| store.handle_timer(event));
//! assert_eq!(storage.writes(), 1);
//! ```

#![warn(unreachable_pub)]

mod config;
mod debounce;
mod error;
mod folder;
mod lifecycle;
mod migration;
mod persistence;
mod scheduler;
mod session;
mod state;
mod store;
mod subscription;
mod watcher;

// Re-exports
pub use config::StoreConfig;
pub use debounce::Debouncer;
pub use error::{MigrationError, StorageError, StoreError};
pub use migration::{migrate, Migrated};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use scheduler::{ManualScheduler, Scheduler, TimerEvent, TimerHandle, TokioScheduler};
pub use session::{CanvasSession, SharedStore};
pub use state::{CanvasState, Notice};
pub use store::{CanvasStore, GenerationTicket};
pub use subscription::SubscriptionId;
pub use watcher::CompletionWatcher;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a canvas store
    pub use crate::{
        CanvasState, CanvasStore, KeyValueStore, ManualScheduler, MemoryStore, Scheduler,
        StoreConfig, StoreError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
