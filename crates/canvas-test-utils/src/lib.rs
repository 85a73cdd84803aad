//! Testing utilities for the canvas workspace
//!
//! Shared fixtures: node builders, a store on a virtual clock and a
//! scripted generation service.

#![allow(missing_docs)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use canvas_gateway::{GenerationError, GenerationService, ImageRequest, ImageResponse, TextRequest, TextStream};
use canvas_model::{
    CanvasNode, ContentPatch, FileData, GeneratorPatch, NodeData, NodeId, NodeKind, NodePatch, Position,
    VariantPatch,
};
use canvas_store::{CanvasStore, ManualScheduler, MemoryStore, SharedStore, StoreConfig};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// A store wired to a virtual clock and in-memory storage
pub struct TestCanvas {
    pub store: CanvasStore,
    pub scheduler: Arc<ManualScheduler>,
    pub storage: Arc<MemoryStore>,
}

impl TestCanvas {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let storage = Arc::new(MemoryStore::new());
        let store = CanvasStore::new(config, scheduler.clone(), storage.clone());
        Self {
            store,
            scheduler,
            storage,
        }
    }

    /// Hydrate a fresh store from `storage`
    pub fn hydrate(storage: Arc<MemoryStore>) -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let store = CanvasStore::hydrate(StoreConfig::default(), scheduler.clone(), storage.clone());
        Self {
            store,
            scheduler,
            storage,
        }
    }

    /// Advance virtual time, applying every timer that falls due
    pub fn advance(&mut self, by: Duration) {
        let store = &mut self.store;
        self.scheduler.advance(by, |event| store.handle_timer(event));
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn add_text(&mut self, text: &str) -> NodeId {
        let id = self.store.add_node(NodeKind::Content, None);
        set_content(&mut self.store, &id, text);
        id
    }

    pub fn add_generator(&mut self, input: &str) -> NodeId {
        let id = self.store.add_node(NodeKind::Generator, None);
        self.store.update_node(
            &id,
            NodePatch::variant(VariantPatch::Generator(GeneratorPatch {
                input: Some(input.to_string()),
                ..GeneratorPatch::default()
            })),
        );
        id
    }

    pub fn alias(&self, id: &NodeId) -> String {
        self.store.node(id).map(|n| n.alias().to_string()).unwrap_or_default()
    }
}

impl Default for TestCanvas {
    fn default() -> Self {
        Self::new()
    }
}

/// Store shared the way a live session shares it
pub fn shared_store() -> (SharedStore, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::new());
    let store = CanvasStore::new(StoreConfig::default(), scheduler.clone(), Arc::new(MemoryStore::new()));
    (Arc::new(Mutex::new(store)), scheduler)
}

pub fn set_content(store: &mut CanvasStore, id: &NodeId, text: &str) {
    store.update_node(
        id,
        NodePatch::variant(VariantPatch::Content(ContentPatch {
            content: Some(Some(text.to_string())),
            ..ContentPatch::default()
        })),
    );
}

pub fn file(name: &str, mime: &str, bytes: &[u8]) -> FileData {
    FileData {
        file_name: name.to_string(),
        file_type: mime.to_string(),
        file_size: bytes.len() as u64,
        data: STANDARD.encode(bytes),
    }
}

pub fn node(id: &str, kind: NodeKind, alias: &str) -> CanvasNode {
    CanvasNode::new(
        NodeId::new(id),
        Position::default(),
        NodeData::new_default(kind, alias.to_string()),
    )
}

/// What a scripted text stream does
#[derive(Debug, Clone)]
pub enum TextScript {
    /// Yield these chunks, then end
    Chunks(Vec<Vec<u8>>),
    /// Yield these chunks, then never end
    Hang(Vec<Vec<u8>>),
    /// Fail the request with this status
    Status(u16),
}

/// Generation service answering from a script and recording requests
#[derive(Debug)]
pub struct ScriptedGenerationService {
    text: TextScript,
    image: ImageResponse,
    pub text_requests: Mutex<Vec<TextRequest>>,
    pub image_requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedGenerationService {
    pub fn text(chunks: &[&str]) -> Self {
        Self::with_script(TextScript::Chunks(chunks.iter().map(|c| c.as_bytes().to_vec()).collect()))
    }

    pub fn with_script(text: TextScript) -> Self {
        Self {
            text,
            image: ImageResponse::default(),
            text_requests: Mutex::new(Vec::new()),
            image_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_image(mut self, image: ImageResponse) -> Self {
        self.image = image;
        self
    }
}

#[async_trait::async_trait]
impl GenerationService for ScriptedGenerationService {
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, GenerationError> {
        self.text_requests.lock().push(request);
        match &self.text {
            TextScript::Chunks(chunks) => Ok(futures::stream::iter(chunks.clone().into_iter().map(Ok)).boxed()),
            TextScript::Hang(chunks) => Ok(futures::stream::iter(chunks.clone().into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed()),
            TextScript::Status(status) => Err(GenerationError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, GenerationError> {
        self.image_requests.lock().push(request);
        Ok(self.image.clone())
    }
}
