//! Generator outputs and assembled message parts

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// One image produced by an image-capable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Base64 payload
    pub base64: String,
    /// MIME type of the payload
    pub mime_type: String,
    /// Prompt as rewritten by the model, if it reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// Structured output of a generator box, discriminated by `mode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GeneratorOutput {
    /// Streamed text
    Text {
        /// Accumulated text
        text: String,
    },
    /// Generated images
    Image {
        /// Images in the order the model returned them
        images: Vec<GeneratedImage>,
        /// Prompt that produced them
        prompt: String,
    },
    /// Generated component source
    Component {
        /// Component source code
        code: String,
        /// Compile or render error reported for `code`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl GeneratorOutput {
    /// Text output
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Render as plain text for alias values and prompts
    ///
    /// Image and component outputs become bracketed placeholders rather than
    /// their raw payload.
    #[must_use]
    pub fn as_plain_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text { text } => Cow::Borrowed(text),
            Self::Image { images, .. } => Cow::Owned(format!("[Image: {} generated]", images.len())),
            Self::Component { .. } => Cow::Borrowed("[Component code]"),
        }
    }
}

/// One typed fragment of an assembled message, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContentPart {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Inline image
    Image {
        /// Base64 payload
        image: String,
        /// MIME type of the payload
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Inline file (pdf, audio, office documents)
    File {
        /// Base64 payload
        data: String,
        /// MIME type of the payload
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl MessageContentPart {
    /// Text part
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image part
    #[inline]
    #[must_use]
    pub fn image(image: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            image: image.into(),
            mime_type: mime_type.into(),
        }
    }

    /// File part
    #[inline]
    #[must_use]
    pub fn file(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::File {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Check if this part carries binary media (image or file)
    #[inline]
    #[must_use]
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    /// Text of a text part
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}
