//! Generation service port and its HTTP implementation

use super::request::{ImageRequest, ImageResponse, TextRequest};
use crate::error::GenerationError;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

/// Raw byte chunks of a streamed text response
pub type TextStream = BoxStream<'static, Result<Vec<u8>, GenerationError>>;

/// Backend that turns prompts into text or images
///
/// Implement this trait to plug in a different transport.
#[async_trait::async_trait]
pub trait GenerationService: Send + Sync {
    /// Start a streaming text generation
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, GenerationError>;

    /// Generate images in one round trip
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, GenerationError>;
}

/// Generation service reached over HTTP
///
/// Posts to `<base>/api/generate` and `<base>/api/generate-image`.
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationService {
    /// Create a client for the service at `base_url`
    ///
    /// # Errors
    /// Returns error if the URL is not http(s) or the client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self, GenerationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GenerationError::InvalidUrl(base_url));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Service base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: serde::Serialize + Sync>(&self, path: &str, body: &T) -> Result<reqwest::Response, GenerationError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl GenerationService for HttpGenerationService {
    async fn stream_text(&self, request: TextRequest) -> Result<TextStream, GenerationError> {
        tracing::debug!("streaming text from {} / {}", request.provider, request.model);
        let response = self.post("/api/generate", &request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(GenerationError::from))
            .boxed())
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, GenerationError> {
        tracing::debug!("generating image with {} / {}", request.provider, request.model);
        let response = self.post("/api/generate-image", &request).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let service = HttpGenerationService::new("http://localhost:3000/").unwrap();
        assert_eq!(service.base_url(), "http://localhost:3000");
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = HttpGenerationService::new("ftp://example.com").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidUrl(_)));
    }
}
