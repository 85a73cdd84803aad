//! Canvas Gateway
//!
//! Everything the canvas talks to outside its own process: the JSON data
//! directory, the AI providers and the generation service.
//!
//! # Core Concepts
//!
//! - [`JsonFileRoot`]: traversal-guarded JSON read, write and listing under
//!   one data directory
//! - [`providers`]: model capabilities and the provider catalog
//! - [`GenerationService`]: async port for text streaming and image
//!   generation; [`HttpGenerationService`] implements it over HTTP
//! - [`GenerationRunner`]: drives a generator box and reports into the
//!   store, with real cancellation
//! - [`AutoExporter`]: writes a data2ui export when its source generator
//!   finishes
//!
//! # Example
//!
//! ```rust
//! use canvas_gateway::{JsonFileRoot, GatewayError};
//!
//! let root = JsonFileRoot::new("/srv/canvas-data");
//! assert!(root.resolve("widgets/list.json").is_ok());
//! assert!(matches!(root.resolve("../secrets.json"), Err(GatewayError::PathTraversal(_))));
//! ```

#![warn(unreachable_pub)]

mod error;
pub mod export;
pub mod generation;
mod json_files;
pub mod providers;

// Re-exports
pub use error::{ExportError, GatewayError, GenerationError};
pub use export::{extract_json, validate_recent_memories, AutoExporter, ExportStatus, PreparedExport};
pub use generation::{
    GenerationRunner, GenerationService, HttpGenerationService, ImageRequest, ImageResponse, RunOutcome,
    TextRequest, TextStream,
};
pub use json_files::JsonFileRoot;
pub use providers::{model_capabilities, ModelCapability, ModelInfo, ProviderCatalog, ProviderData};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
