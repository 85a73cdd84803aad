//! Generation runs against a scripted service

use canvas_gateway::generation::{GenerationService, ImageRequest, TextBody, TextRequest, TextStream};
use canvas_gateway::{GenerationError, GenerationRunner, ImageResponse, RunOutcome};
use canvas_model::{
    AiProvider, GeneratedImage, GeneratorOutput, GeneratorPatch, MessageContentPart, NodeId, NodeKind, NodePatch,
    VariantPatch,
};
use canvas_store::SharedStore;
use canvas_test_utils::{file, set_content, shared_store, ScriptedGenerationService, TextScript};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn add_generator(store: &SharedStore, input: &str, provider: Option<AiProvider>, model: Option<&str>) -> NodeId {
    let mut store = store.lock();
    let id = store.add_node(NodeKind::Generator, None);
    store.update_node(
        &id,
        NodePatch::variant(VariantPatch::Generator(GeneratorPatch {
            input: Some(input.to_string()),
            provider: Some(provider),
            model: Some(model.map(str::to_string)),
            ..GeneratorPatch::default()
        })),
    );
    id
}

fn output_of(store: &SharedStore, id: &NodeId) -> Option<GeneratorOutput> {
    store.lock().node(id).and_then(|n| n.data.as_generator()).and_then(|g| g.output.clone())
}

fn is_running(store: &SharedStore, id: &NodeId) -> bool {
    store.lock().node(id).and_then(|n| n.data.as_generator()).is_some_and(|g| g.is_running)
}

#[tokio::test]
async fn streamed_chunks_accumulate_across_split_characters() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "say hi", None, None);
    // "héllo" with the two-byte é split across chunks
    let script = TextScript::Chunks(vec![b"h\xc3".to_vec(), b"\xa9llo".to_vec()]);
    let service = Arc::new(ScriptedGenerationService::with_script(script));
    let runner = GenerationRunner::new(store.clone(), service.clone());

    assert_eq!(runner.run(&id).await.unwrap(), RunOutcome::Completed);
    assert_eq!(output_of(&store, &id), Some(GeneratorOutput::text("héllo")));
    assert!(!is_running(&store, &id));
    assert!(!runner.is_active(&id));

    let requests = service.text_requests.lock();
    assert_eq!(requests[0].provider, AiProvider::OpenAi);
    assert_eq!(requests[0].model, "gpt-4o");
    assert_eq!(requests[0].body, TextBody::Prompt { prompt: "say hi".to_string() });
}

#[tokio::test]
async fn attached_files_are_sent_as_messages() {
    let (store, _) = shared_store();
    {
        let mut store = store.lock();
        store.add_content_node_with_file(file("cat.png", "image/png", &[0x89, 0x50]), None);
    }
    let id = add_generator(&store, "describe @con-1", Some(AiProvider::Anthropic), Some("claude-opus-4-6"));
    let service = Arc::new(ScriptedGenerationService::text(&["a cat"]));
    let runner = GenerationRunner::new(store.clone(), service.clone());

    runner.run(&id).await.unwrap();

    let requests = service.text_requests.lock();
    let TextBody::Messages { messages } = &requests[0].body else {
        panic!("expected a message request");
    };
    assert_eq!(
        messages[0].content,
        vec![
            MessageContentPart::text("describe "),
            MessageContentPart::image("iVA=", "image/png"),
        ]
    );
}

#[tokio::test]
async fn service_failure_is_recorded_on_the_node() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "x", None, None);
    let service = Arc::new(ScriptedGenerationService::with_script(TextScript::Status(500)));
    let runner = GenerationRunner::new(store.clone(), service);

    let err = runner.run(&id).await.unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 500, .. }));

    let store = store.lock();
    let generator = store.node(&id).and_then(|n| n.data.as_generator()).unwrap();
    assert!(!generator.is_running);
    assert!(generator.output.is_none());
    assert!(generator.error.as_deref().is_some_and(|e| e.contains("500")));
}

#[tokio::test]
async fn running_generator_cannot_start_twice() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "x", None, None);
    assert!(store.lock().begin_generation(&id).is_some());
    let runner = GenerationRunner::new(store.clone(), Arc::new(ScriptedGenerationService::text(&["y"])));

    assert!(matches!(runner.run(&id).await, Err(GenerationError::NotStartable(_))));

    let content = store.lock().add_node(NodeKind::Content, None);
    assert!(matches!(runner.run(&content).await, Err(GenerationError::NotStartable(_))));
}

#[tokio::test]
async fn cancel_stops_the_stream_and_keeps_partial_output() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "x", None, None);
    let script = TextScript::Hang(vec![b"partial".to_vec()]);
    let runner = Arc::new(GenerationRunner::new(
        store.clone(),
        Arc::new(ScriptedGenerationService::with_script(script)),
    ));

    let handle = runner.spawn(id.clone());
    for _ in 0..100 {
        if output_of(&store, &id).is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(runner.is_active(&id));
    assert!(runner.cancel(&id));

    assert_eq!(handle.await.unwrap().unwrap(), RunOutcome::Cancelled);
    assert_eq!(output_of(&store, &id), Some(GeneratorOutput::text("partial")));
    assert!(!is_running(&store, &id));
    assert!(!runner.cancel(&id));
}

#[tokio::test]
async fn retry_after_cancel_survives_the_old_run_winding_down() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "x", None, None);
    let script = TextScript::Hang(vec![b"partial".to_vec()]);
    let runner = Arc::new(GenerationRunner::new(
        store.clone(),
        Arc::new(ScriptedGenerationService::with_script(script)),
    ));

    let first = runner.spawn(id.clone());
    for _ in 0..100 {
        if output_of(&store, &id).is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(runner.cancel(&id));

    // the retry starts before the first task sees its cancellation
    let second = runner.run(&id);
    tokio::pin!(second);
    assert!(futures::poll!(second.as_mut()).is_pending());
    assert!(is_running(&store, &id));

    assert_eq!(first.await.unwrap().unwrap(), RunOutcome::Cancelled);
    assert!(is_running(&store, &id));
    assert!(runner.is_active(&id));
    assert_eq!(output_of(&store, &id), Some(GeneratorOutput::text("partial")));

    assert!(runner.cancel(&id));
    assert_eq!(second.await.unwrap(), RunOutcome::Cancelled);
    assert!(!is_running(&store, &id));
}

/// Image backend that stops the generator through the store before answering
struct StoppedDuringImage {
    store: SharedStore,
    node_id: NodeId,
    image: GeneratedImage,
}

#[async_trait::async_trait]
impl GenerationService for StoppedDuringImage {
    async fn stream_text(&self, _request: TextRequest) -> Result<TextStream, GenerationError> {
        Err(GenerationError::UnexpectedResponse("text is not scripted".to_string()))
    }

    async fn generate_image(&self, _request: ImageRequest) -> Result<ImageResponse, GenerationError> {
        self.store.lock().set_generator_running(&self.node_id, false);
        Ok(ImageResponse {
            images: vec![self.image.clone()],
            text_fallback: None,
        })
    }
}

#[tokio::test]
async fn image_arriving_after_stop_is_discarded() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "a red fox", Some(AiProvider::OpenAi), Some("dall-e-3"));
    let service = Arc::new(StoppedDuringImage {
        store: store.clone(),
        node_id: id.clone(),
        image: GeneratedImage {
            base64: "AAAA".to_string(),
            mime_type: "image/png".to_string(),
            revised_prompt: None,
        },
    });
    let runner = GenerationRunner::new(store.clone(), service);

    assert_eq!(runner.run(&id).await.unwrap(), RunOutcome::Cancelled);
    assert_eq!(output_of(&store, &id), None);
    assert!(!is_running(&store, &id));
    assert!(!runner.is_active(&id));
}

#[tokio::test]
async fn image_models_store_images() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "a red fox", Some(AiProvider::OpenAi), Some("dall-e-3"));
    let image = GeneratedImage {
        base64: "AAAA".to_string(),
        mime_type: "image/png".to_string(),
        revised_prompt: None,
    };
    let service = Arc::new(ScriptedGenerationService::text(&[]).with_image(ImageResponse {
        images: vec![image.clone()],
        text_fallback: None,
    }));
    let runner = GenerationRunner::new(store.clone(), service.clone());

    runner.run(&id).await.unwrap();

    assert_eq!(
        output_of(&store, &id),
        Some(GeneratorOutput::Image {
            images: vec![image],
            prompt: "a red fox".to_string(),
        })
    );
    assert!(service.text_requests.lock().is_empty());
    assert_eq!(service.image_requests.lock()[0].model, "dall-e-3");
}

#[tokio::test]
async fn gemini_image_text_fallback_becomes_text_output() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "draw", Some(AiProvider::Google), Some("gemini-2.5-flash-image"));
    let service = Arc::new(ScriptedGenerationService::text(&[]).with_image(ImageResponse {
        images: Vec::new(),
        text_fallback: Some("I can only describe it".to_string()),
    }));
    let runner = GenerationRunner::new(store.clone(), service);

    runner.run(&id).await.unwrap();
    assert_eq!(output_of(&store, &id), Some(GeneratorOutput::text("I can only describe it")));
}

#[tokio::test]
async fn empty_image_response_is_an_error() {
    let (store, _) = shared_store();
    let id = add_generator(&store, "draw", Some(AiProvider::OpenAi), Some("dall-e-3"));
    let runner = GenerationRunner::new(store.clone(), Arc::new(ScriptedGenerationService::text(&[])));

    assert!(matches!(runner.run(&id).await, Err(GenerationError::UnexpectedResponse(_))));
    assert!(!is_running(&store, &id));
}

#[tokio::test]
async fn referenced_text_is_resolved_before_sending() {
    let (store, _) = shared_store();
    {
        let mut store = store.lock();
        let content = store.add_node(NodeKind::Content, None);
        set_content(&mut store, &content, "the sea");
    }
    let id = add_generator(&store, "poem about @con-1", None, None);
    let service = Arc::new(ScriptedGenerationService::text(&["waves"]));
    let runner = GenerationRunner::new(store.clone(), service.clone());

    runner.run(&id).await.unwrap();
    assert_eq!(
        service.text_requests.lock()[0].body,
        TextBody::Prompt {
            prompt: "poem about the sea".to_string()
        }
    );
}
