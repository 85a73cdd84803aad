//! Generation: request shaping, the service port and the run driver

mod decoder;
mod request;
mod runner;
mod service;

pub use decoder::Utf8Decoder;
pub use request::{ChatMessage, ImageRequest, ImageResponse, TextBody, TextRequest};
pub use runner::{uses_image_path, GenerationRunner, RunOutcome};
pub use service::{GenerationService, HttpGenerationService, TextStream};
