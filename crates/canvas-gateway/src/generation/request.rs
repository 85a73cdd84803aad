//! Request and response shapes of the generation service

use canvas_content::{concat_text, has_media_parts};
use canvas_model::{AiProvider, GeneratedImage, MessageContentPart};
use serde::{Deserialize, Serialize};

/// One chat message carrying typed parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role
    pub role: String,
    /// Ordered parts
    pub content: Vec<MessageContentPart>,
}

/// Body of a text request: a plain prompt, or structured messages when
/// media is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBody {
    /// Text-only prompt
    Prompt {
        /// Concatenated text
        prompt: String,
    },
    /// Multi-part message list
    Messages {
        /// Messages in order
        messages: Vec<ChatMessage>,
    },
}

/// Streaming text request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRequest {
    /// Prompt or messages
    #[serde(flatten)]
    pub body: TextBody,
    /// Provider to route to
    pub provider: AiProvider,
    /// Model id
    pub model: String,
}

impl TextRequest {
    /// Shape a request from assembled parts
    ///
    /// Any image or file part selects the message form; otherwise the text
    /// parts are joined into one prompt.
    #[must_use]
    pub fn from_parts(parts: Vec<MessageContentPart>, provider: AiProvider, model: impl Into<String>) -> Self {
        let body = if has_media_parts(&parts) {
            TextBody::Messages {
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content: parts,
                }],
            }
        } else {
            TextBody::Prompt {
                prompt: concat_text(&parts),
            }
        };
        Self {
            body,
            provider,
            model: model.into(),
        }
    }
}

/// Non-streaming image request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Text prompt
    pub prompt: String,
    /// Provider to route to
    pub provider: AiProvider,
    /// Model id
    pub model: String,
    /// Number of images
    pub n: u32,
    /// Requested size, e.g. `1024x1024`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl ImageRequest {
    /// Request one image
    #[must_use]
    pub fn new(prompt: impl Into<String>, provider: AiProvider, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider,
            model: model.into(),
            n: 1,
            size: None,
        }
    }
}

/// Image response: images, or text when the model answered in prose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    /// Generated images
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    /// Text returned instead of an image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fallback: Option<String>,
}
