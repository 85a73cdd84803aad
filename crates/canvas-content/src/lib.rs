//! Canvas Content
//!
//! Turns prompt text with `@alias` references into the ordered list of
//! typed parts a generation request carries.
//!
//! # Core Concepts
//!
//! - **NodeSource**: read access to the nodes references resolve against
//! - **Assembly**: literal runs become text parts, references become text,
//!   image or file parts depending on the referenced node
//! - **Folders**: expanded one level between `[Folder: …]` and
//!   `[End Folder: …]` markers
//! - **Files**: routed by MIME type; text files are decoded inline
//!
//! # Example
//!
//! ```rust
//! use canvas_content::build_message_content;
//! use canvas_model::{CanvasNode, MessageContentPart};
//!
//! let nodes: Vec<CanvasNode> = Vec::new();
//! let parts = build_message_content("hello @nobody", &nodes);
//!
//! assert_eq!(
//!     parts,
//!     vec![
//!         MessageContentPart::text("hello "),
//!         MessageContentPart::text("@nobody"),
//!     ]
//! );
//! ```

#![warn(unreachable_pub)]

mod assembler;
pub mod mime;

// Re-exports
pub use assembler::{build_message_content, concat_text, has_media_parts, NodeSource};
pub use mime::{classify, FileClass};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
