//! Canvas Model
//!
//! Typed payloads for every box that can live on a canvas.
//!
//! # Core Concepts
//!
//! - [`CanvasNode`]: identity, position and a tagged [`NodeData`] payload
//! - [`NodeKind`]: the node type discriminant (generator, content, component, ...)
//! - [`NodePatch`]: a shallow partial update that never changes the discriminant
//! - [`GeneratorOutput`]: text, image or component output of a generator box
//! - [`MessageContentPart`]: one typed fragment of an assembled prompt
//! - [`CanvasDocument`]: the versioned blob that is persisted
//!
//! # Example
//!
//! ```rust
//! use canvas_model::{CanvasNode, NodeData, NodeId, NodeKind, Position};
//!
//! let data = NodeData::new_default(NodeKind::Content, "con-1".to_string());
//! let node = CanvasNode::new(NodeId::generate(), Position::new(10.0, 20.0), data);
//!
//! assert_eq!(node.alias(), "con-1");
//! assert_eq!(node.kind(), NodeKind::Content);
//! ```

#![warn(unreachable_pub)]

mod defaults;
mod document;
mod error;
mod id;
mod kind;
mod node;
mod output;
mod patch;
mod pulse;

// Re-exports
pub use defaults::{BoxSize, DEFAULT_FOLDER_LABEL};
pub use document::{CanvasDocument, Counters, CURRENT_SCHEMA_VERSION};
pub use error::ModelError;
pub use id::{NodeId, PulseId};
pub use kind::NodeKind;
pub use node::{
    AiProvider, CanvasNode, ComponentData, ContentData, Data2UiData, FileData, FolderColor,
    FolderData, GeneratorData, IframeData, NodeData, Position, ViewMode,
};
pub use output::{GeneratedImage, GeneratorOutput, MessageContentPart};
pub use patch::{
    ComponentPatch, ContentPatch, Data2UiPatch, FolderPatch, GeneratorPatch, IframePatch,
    NodePatch, VariantPatch,
};
pub use pulse::Pulse;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with canvas nodes
    pub use crate::{
        CanvasDocument, CanvasNode, Counters, GeneratorOutput, MessageContentPart, NodeData,
        NodeId, NodeKind, NodePatch, Position,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
