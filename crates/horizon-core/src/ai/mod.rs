pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::provider::Provider;

/// Why a generation request produced no reply
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} API key not configured. Press 'p' to pick another provider.")]
    MissingKey(&'static str),

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("{0} sent a reply that could not be read: {1}")]
    Malformed(&'static str, String),
}

/// Read a successful response body and decode it as `T`.
///
/// The body is read first so a dropped connection stays a transport error and
/// only a body that is not the expected JSON becomes `Malformed`.
pub(crate) async fn decode<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, GenerationError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| GenerationError::Malformed(provider, e.to_string()))
}

/// Something that can turn a prompt into reply text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// A concrete provider client
#[derive(Clone)]
pub enum Backend {
    Gemini(Option<GeminiClient>),
    Ollama(OllamaClient),
    Claude(Option<ClaudeClient>),
    OpenAI(Option<OpenAIClient>),
}

impl Backend {
    pub fn provider(&self) -> Provider {
        match self {
            Backend::Gemini(_) => Provider::Gemini,
            Backend::Ollama(_) => Provider::Ollama,
            Backend::Claude(_) => Provider::Claude,
            Backend::OpenAI(_) => Provider::OpenAI,
        }
    }
}

/// A provider client paired with the model to query
#[derive(Clone)]
pub struct Generator {
    backend: Backend,
    model: String,
}

impl Generator {
    pub fn new(backend: Backend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for Generator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let reply = match &self.backend {
            Backend::Gemini(Some(client)) => client.query(&self.model, prompt).await,
            Backend::Ollama(client) => client.query(&self.model, prompt).await,
            Backend::Claude(Some(client)) => client.query(&self.model, prompt).await,
            Backend::OpenAI(Some(client)) => client.query(&self.model, prompt).await,
            Backend::Gemini(None) | Backend::Claude(None) | Backend::OpenAI(None) => {
                Err(GenerationError::MissingKey(self.provider().label()))
            }
        }?;

        if reply.trim().is_empty() {
            return Err(GenerationError::EmptyResponse(self.provider().label()));
        }
        Ok(reply)
    }
}
