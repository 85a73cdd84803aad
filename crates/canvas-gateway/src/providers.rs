//! Provider catalog and model capabilities

use canvas_model::AiProvider;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// What a model can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCapability {
    /// Streams text
    Text,
    /// Produces images
    Image,
    /// Writes usable component code
    Component,
}

/// One selectable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider-side model id
    pub id: String,
    /// Display name
    pub name: String,
    /// Resolved capabilities
    pub capabilities: Vec<ModelCapability>,
}

impl ModelInfo {
    /// Model with capabilities resolved from its id
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let capabilities = model_capabilities(&id);
        Self {
            id,
            name: name.into(),
            capabilities,
        }
    }
}

/// A provider and the models it offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderData {
    /// Display name
    pub name: String,
    /// Models, in listing order
    pub models: Vec<ModelInfo>,
}

/// Available providers, in the order they were configured
pub type ProviderCatalog = IndexMap<AiProvider, ProviderData>;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("model pattern is valid"))
        .collect()
}

static EXCLUDED: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)audio",
        r"(?i)realtime",
        r"(?i)\btts\b",
        r"(?i)search",
        r"(?i)transcribe",
        r"(?i)robotics",
        r"(?i)embedding",
        r"(?i)whisper",
        r"(?i)moderation",
        r"(?i)deep-research",
        r"(?i)computer-use",
    ])
});

const DEDICATED_IMAGE_MODELS: [&str; 3] = ["dall-e-2", "dall-e-3", "gpt-image-1"];

static DEDICATED_IMAGE: Lazy<Vec<Regex>> = Lazy::new(|| compile(&[r"^gpt-image-", r"^imagen-"]));

const GEMINI_IMAGE_MODELS: [&str; 5] = [
    "gemini-2.5-flash-image",
    "gemini-2.0-flash-image",
    "gemini-2.0-flash-exp-image-generation",
    "gemini-3-pro-image-preview",
    "nano-banana-pro-preview",
];

static GEMINI_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)image|banana").expect("model pattern is valid"));

static COMPONENT_CAPABLE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^gpt-4",
        r"^gpt-5",
        r"^o[134](-|$)",
        r"^claude-(sonnet|opus)-4",
        r"^claude-3-[5-9]-",
        r"^claude-3-opus",
        r"^claude-(sonnet|opus|haiku)-[4-9]",
        r"^gemini-[23]\.",
        r"^gemini-3",
    ])
});

/// Check if a model should be left out of the catalog entirely
#[must_use]
pub fn should_exclude_model(model_id: &str) -> bool {
    EXCLUDED.iter().any(|p| p.is_match(model_id))
}

/// Check if a model only generates images
#[must_use]
pub fn is_dedicated_image_model(model_id: &str) -> bool {
    DEDICATED_IMAGE_MODELS.contains(&model_id) || DEDICATED_IMAGE.iter().any(|p| p.is_match(model_id))
}

/// Check if a model is a multimodal model that can answer with images
#[must_use]
pub fn is_gemini_image_model(model_id: &str) -> bool {
    GEMINI_IMAGE_MODELS.contains(&model_id) || GEMINI_IMAGE.is_match(model_id)
}

fn is_component_capable(model_id: &str) -> bool {
    COMPONENT_CAPABLE.iter().any(|p| p.is_match(model_id))
}

/// Resolve what a model can produce from its id
#[must_use]
pub fn model_capabilities(model_id: &str) -> Vec<ModelCapability> {
    if is_dedicated_image_model(model_id) {
        return vec![ModelCapability::Image];
    }
    if is_gemini_image_model(model_id) {
        return vec![ModelCapability::Text, ModelCapability::Image];
    }
    let mut caps = vec![ModelCapability::Text];
    if is_component_capable(model_id) {
        caps.push(ModelCapability::Component);
    }
    caps
}

/// Check if a model is on the curated short list for its provider
#[must_use]
pub fn is_curated_model(provider: AiProvider, model_id: &str) -> bool {
    let curated: &[&str] = match provider {
        AiProvider::Google => &[
            "gemini-2.5-flash",
            "gemini-2.5-pro",
            "gemini-2.0-flash-exp-image-generation",
            "nano-banana-pro-preview",
        ],
        AiProvider::Anthropic => &[
            "claude-opus-4-6",
            "claude-sonnet-4-5-20250929",
            "claude-haiku-4-5-20251001",
        ],
        AiProvider::OpenAi => &["gpt-5.2", "gpt-5-nano", "gpt-image-1.5", "gpt-image-1-mini"],
    };
    curated.contains(&model_id)
}

/// Model used when a generator has none selected
#[must_use]
pub fn default_model(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::OpenAi => "gpt-4o",
        AiProvider::Anthropic => "claude-sonnet-4-5-20250929",
        AiProvider::Google => "gemini-2.5-flash",
    }
}

/// Parse an OpenAI model listing: `gpt-*` models except `instruct`,
/// sorted by id
#[must_use]
pub fn parse_openai_models(listing: &Value) -> Vec<(String, String)> {
    let mut models: Vec<(String, String)> = listing["data"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| m["id"].as_str())
        .filter(|id| id.starts_with("gpt-") && !id.contains("instruct"))
        .map(|id| (id.to_string(), id.to_string()))
        .collect();
    models.sort();
    models
}

/// Parse an Anthropic model listing, preferring `display_name`
#[must_use]
pub fn parse_anthropic_models(listing: &Value) -> Vec<(String, String)> {
    listing["data"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|m| {
            let id = m["id"].as_str()?;
            let name = m["display_name"].as_str().unwrap_or(id);
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// Parse a Google model listing: models supporting `generateContent`, with
/// the `models/` prefix removed
#[must_use]
pub fn parse_google_models(listing: &Value) -> Vec<(String, String)> {
    listing["models"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|m| {
            m["supportedGenerationMethods"]
                .as_array()
                .is_some_and(|methods| methods.iter().any(|v| v == "generateContent"))
        })
        .filter_map(|m| {
            let raw = m["name"].as_str()?;
            let id = raw.strip_prefix("models/").unwrap_or(raw);
            let name = m["displayName"].as_str().unwrap_or(id);
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// Turn a raw listing into a catalog entry
///
/// Excluded models are dropped; unless `show_all` is set only curated
/// models remain. Returns `None` if nothing is left.
#[must_use]
pub fn build_provider_entry(provider: AiProvider, raw: Vec<(String, String)>, show_all: bool) -> Option<ProviderData> {
    let models: Vec<ModelInfo> = raw
        .into_iter()
        .filter(|(id, _)| !should_exclude_model(id))
        .filter(|(id, _)| show_all || is_curated_model(provider, id))
        .map(|(id, name)| ModelInfo::new(id, name))
        .collect();
    if models.is_empty() {
        return None;
    }
    Some(ProviderData {
        name: provider.display_name().to_string(),
        models,
    })
}

/// API keys of the configured providers
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    /// `OPENAI_API_KEY`
    pub openai: Option<String>,
    /// `ANTHROPIC_API_KEY`
    pub anthropic: Option<String>,
    /// `GOOGLE_GENERATIVE_AI_API_KEY`
    pub google: Option<String>,
}

impl ProviderKeys {
    /// Read keys from the environment; empty values count as missing
    #[must_use]
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai: read("OPENAI_API_KEY"),
            anthropic: read("ANTHROPIC_API_KEY"),
            google: read("GOOGLE_GENERATIVE_AI_API_KEY"),
        }
    }

    /// Check if no provider is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.anthropic.is_none() && self.google.is_none()
    }
}

/// Fetches model listings from the providers' APIs
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    keys: ProviderKeys,
}

impl ProviderClient {
    /// Create a client for the given keys
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(keys: ProviderKeys) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, keys })
    }

    /// Catalog of every configured provider that lists at least one model
    ///
    /// A provider whose listing fails is left out.
    pub async fn fetch_catalog(&self, show_all: bool) -> ProviderCatalog {
        let (openai, anthropic, google) = futures::join!(
            self.fetch_openai(),
            self.fetch_anthropic(),
            self.fetch_google()
        );

        let mut catalog = ProviderCatalog::new();
        for (provider, raw) in [
            (AiProvider::OpenAi, openai),
            (AiProvider::Anthropic, anthropic),
            (AiProvider::Google, google),
        ] {
            if let Some(entry) = build_provider_entry(provider, raw, show_all) {
                catalog.insert(provider, entry);
            }
        }
        catalog
    }

    async fn fetch_openai(&self) -> Vec<(String, String)> {
        let Some(key) = &self.keys.openai else {
            return Vec::new();
        };
        let request = self
            .client
            .get("https://api.openai.com/v1/models")
            .bearer_auth(key);
        self.listing(AiProvider::OpenAi, request)
            .await
            .map(|v| parse_openai_models(&v))
            .unwrap_or_default()
    }

    async fn fetch_anthropic(&self) -> Vec<(String, String)> {
        let Some(key) = &self.keys.anthropic else {
            return Vec::new();
        };
        let request = self
            .client
            .get("https://api.anthropic.com/v1/models")
            .header("x-api-key", key)
            .header("anthropic-version", "2023-06-01");
        self.listing(AiProvider::Anthropic, request)
            .await
            .map(|v| parse_anthropic_models(&v))
            .unwrap_or_default()
    }

    async fn fetch_google(&self) -> Vec<(String, String)> {
        let Some(key) = &self.keys.google else {
            return Vec::new();
        };
        let request = self
            .client
            .get("https://generativelanguage.googleapis.com/v1beta/models")
            .query(&[("key", key)]);
        self.listing(AiProvider::Google, request)
            .await
            .map(|v| parse_google_models(&v))
            .unwrap_or_default()
    }

    async fn listing(&self, provider: AiProvider, request: reqwest::RequestBuilder) -> Option<Value> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("failed to list {} models: {}", provider, e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!("failed to list {} models: HTTP {}", provider, response.status());
            return None;
        }
        match response.json().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("failed to parse {} model listing: {}", provider, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use ModelCapability::{Component, Image, Text};

    #[test]
    fn capabilities_follow_priority() {
        assert_eq!(model_capabilities("dall-e-3"), vec![Image]);
        assert_eq!(model_capabilities("gpt-image-1.5"), vec![Image]);
        assert_eq!(model_capabilities("imagen-4.0-generate"), vec![Image]);
        assert_eq!(model_capabilities("gemini-2.5-flash-image"), vec![Text, Image]);
        assert_eq!(model_capabilities("nano-banana-pro-preview"), vec![Text, Image]);
        assert_eq!(model_capabilities("gpt-4o"), vec![Text, Component]);
        assert_eq!(model_capabilities("o3-mini"), vec![Text, Component]);
        assert_eq!(model_capabilities("claude-3-5-sonnet-20241022"), vec![Text, Component]);
        assert_eq!(model_capabilities("claude-haiku-4-5-20251001"), vec![Text, Component]);
        assert_eq!(model_capabilities("gemini-2.5-pro"), vec![Text, Component]);
        assert_eq!(model_capabilities("gpt-3.5-turbo"), vec![Text]);
        assert_eq!(model_capabilities("o2"), vec![Text]);
    }

    #[test]
    fn exclusion_patterns() {
        assert!(should_exclude_model("gpt-4o-audio-preview"));
        assert!(should_exclude_model("gpt-4o-mini-tts"));
        assert!(should_exclude_model("text-embedding-3-large"));
        assert!(!should_exclude_model("gpt-4o"));
        assert!(!should_exclude_model("gpt-4o-mini-ttsx"));
    }

    #[test]
    fn parses_listings() {
        let openai = json!({"data": [
            {"id": "gpt-4o"}, {"id": "dall-e-3"}, {"id": "gpt-3.5-turbo-instruct"}, {"id": "gpt-4"}
        ]});
        assert_eq!(
            parse_openai_models(&openai),
            vec![("gpt-4".into(), "gpt-4".into()), ("gpt-4o".into(), "gpt-4o".into())]
        );

        let anthropic = json!({"data": [{"id": "claude-x", "display_name": "Claude X"}, {"id": "claude-y"}]});
        assert_eq!(
            parse_anthropic_models(&anthropic),
            vec![("claude-x".into(), "Claude X".into()), ("claude-y".into(), "claude-y".into())]
        );

        let google = json!({"models": [
            {"name": "models/gemini-2.5-pro", "displayName": "Gemini 2.5 Pro",
             "supportedGenerationMethods": ["generateContent"]},
            {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}
        ]});
        assert_eq!(
            parse_google_models(&google),
            vec![("gemini-2.5-pro".into(), "Gemini 2.5 Pro".into())]
        );
        assert!(parse_google_models(&json!({})).is_empty());
    }

    #[test]
    fn entry_filters_curated_unless_show_all() {
        let raw = vec![
            ("gpt-5.2".to_string(), "gpt-5.2".to_string()),
            ("gpt-4o".to_string(), "gpt-4o".to_string()),
            ("gpt-4o-realtime".to_string(), "gpt-4o-realtime".to_string()),
        ];
        let curated = build_provider_entry(AiProvider::OpenAi, raw.clone(), false).unwrap();
        assert_eq!(curated.name, "OpenAI");
        assert_eq!(curated.models.len(), 1);
        assert_eq!(curated.models[0].capabilities, vec![Text, Component]);

        let all = build_provider_entry(AiProvider::OpenAi, raw, true).unwrap();
        let ids: Vec<_> = all.models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-5.2", "gpt-4o"]);

        assert!(build_provider_entry(AiProvider::Google, Vec::new(), true).is_none());
    }
}
