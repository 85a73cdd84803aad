//! Runs generator boxes against a generation service

use super::decoder::Utf8Decoder;
use super::request::{ImageRequest, TextRequest};
use super::service::GenerationService;
use crate::error::GenerationError;
use crate::providers::{default_model, is_gemini_image_model, model_capabilities, ModelCapability};
use canvas_content::concat_text;
use canvas_model::{AiProvider, GeneratorOutput, NodeId};
use canvas_store::{GenerationTicket, SharedStore};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a run ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Output is complete
    Completed,
    /// Stopped early; partial output is kept
    Cancelled,
}

/// Check if a model is driven through the image endpoint
#[must_use]
pub fn uses_image_path(provider: AiProvider, model: &str) -> bool {
    !model_capabilities(model).contains(&ModelCapability::Text)
        || (provider == AiProvider::Google && is_gemini_image_model(model))
}

/// Drives generation runs and reports into the store
///
/// Each run owns a cancellation token. Cancelling drops the in-flight
/// request instead of only ignoring its output.
pub struct GenerationRunner {
    store: SharedStore,
    service: Arc<dyn GenerationService>,
    active: DashMap<NodeId, (u64, CancellationToken)>,
    next_run: AtomicU64,
}

impl std::fmt::Debug for GenerationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRunner")
            .field("active", &self.active.len())
            .finish_non_exhaustive()
    }
}

impl GenerationRunner {
    /// Create a runner over `store`
    #[must_use]
    pub fn new(store: SharedStore, service: Arc<dyn GenerationService>) -> Self {
        Self {
            store,
            service,
            active: DashMap::new(),
            next_run: AtomicU64::new(0),
        }
    }

    /// Check if a run is in flight for `node_id`
    #[must_use]
    pub fn is_active(&self, node_id: &NodeId) -> bool {
        self.active.contains_key(node_id)
    }

    /// Run a generator to completion
    ///
    /// The store sees the run start, each streamed chunk, and the end.
    /// Clearing the generator's running flag in the store also stops the
    /// stream at the next chunk.
    ///
    /// # Errors
    /// - [`GenerationError::NotStartable`] if the node is not an idle
    ///   generator
    /// - Any service error; it is also recorded on the node
    pub async fn run(&self, node_id: &NodeId) -> Result<RunOutcome, GenerationError> {
        let ticket = self
            .store
            .lock()
            .begin_generation(node_id)
            .ok_or_else(|| GenerationError::NotStartable(node_id.clone()))?;

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.active.insert(node_id.clone(), (run_id, token.clone())) {
            previous.cancel();
        }

        let result = tokio::select! {
            () = token.cancelled() => Err(GenerationError::Cancelled),
            result = self.drive(&ticket) => result,
        };
        // a run that was cancelled or superseded no longer owns the node's
        // flags; cancel() already reset them and a newer run may hold them
        let owned = self.active.remove_if(node_id, |_, (id, _)| *id == run_id).is_some();

        match result {
            Ok(()) => {
                if owned {
                    self.store.lock().set_generator_running(node_id, false);
                }
                tracing::info!("generation finished for {}", node_id);
                Ok(RunOutcome::Completed)
            }
            Err(GenerationError::Cancelled) => {
                if owned {
                    self.store.lock().set_generator_running(node_id, false);
                }
                tracing::info!("generation cancelled for {}", node_id);
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => {
                if owned {
                    self.store.lock().set_generator_error(node_id, e.to_string());
                } else {
                    tracing::debug!("dropping error of stale run for {}: {}", node_id, e);
                }
                Err(e)
            }
        }
    }

    /// Run on a spawned task
    pub fn spawn(self: &Arc<Self>, node_id: NodeId) -> tokio::task::JoinHandle<Result<RunOutcome, GenerationError>> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run(&node_id).await })
    }

    /// Stop the run for `node_id`; returns whether one was in flight
    pub fn cancel(&self, node_id: &NodeId) -> bool {
        let Some((_, (_, token))) = self.active.remove(node_id) else {
            return false;
        };
        token.cancel();
        self.store.lock().set_generator_running(node_id, false);
        true
    }

    async fn drive(&self, ticket: &GenerationTicket) -> Result<(), GenerationError> {
        let provider = ticket.provider.unwrap_or(AiProvider::OpenAi);
        let model = ticket
            .model
            .clone()
            .unwrap_or_else(|| default_model(provider).to_string());

        if uses_image_path(provider, &model) {
            self.drive_image(ticket, provider, model).await
        } else {
            self.drive_text(ticket, provider, model).await
        }
    }

    async fn drive_text(&self, ticket: &GenerationTicket, provider: AiProvider, model: String) -> Result<(), GenerationError> {
        let request = TextRequest::from_parts(ticket.parts.clone(), provider, model);
        let mut stream = self.service.stream_text(request).await?;
        let mut decoder = Utf8Decoder::new();

        while let Some(chunk) = stream.next().await {
            let text = decoder.decode(&chunk?);
            self.append(&ticket.node_id, &text)?;
        }
        self.append(&ticket.node_id, &decoder.finish())
    }

    fn append(&self, node_id: &NodeId, text: &str) -> Result<(), GenerationError> {
        if text.is_empty() {
            return Ok(());
        }
        let accepted = self.store.lock().append_generator_text(node_id, text);
        if accepted {
            Ok(())
        } else {
            Err(GenerationError::Cancelled)
        }
    }

    async fn drive_image(&self, ticket: &GenerationTicket, provider: AiProvider, model: String) -> Result<(), GenerationError> {
        let mut prompt = concat_text(&ticket.parts);
        if prompt.trim().is_empty() {
            prompt.clone_from(&ticket.input);
        }
        let response = self
            .service
            .generate_image(ImageRequest::new(prompt.clone(), provider, model))
            .await?;

        let output = if !response.images.is_empty() {
            GeneratorOutput::Image {
                images: response.images,
                prompt,
            }
        } else if let Some(text) = response.text_fallback {
            GeneratorOutput::text(text)
        } else {
            return Err(GenerationError::UnexpectedResponse("no images returned".to_string()));
        };
        let mut store = self.store.lock();
        let running = store
            .node(&ticket.node_id)
            .and_then(|node| node.data.as_generator())
            .is_some_and(|generator| generator.is_running);
        if !running {
            return Err(GenerationError::Cancelled);
        }
        store.set_generator_output(&ticket.node_id, Some(output));
        Ok(())
    }
}
