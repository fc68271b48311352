//! Query embedding backends.
//!
//! Chunks in the vector collection were embedded by an external ingestion
//! job; queries must be embedded with the same model to be comparable.

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use tracing::debug;

use crate::config::{Config, EmbeddingProvider, DEFAULT_EMBEDDING_MODEL};
use crate::integrations::OllamaClient;
use crate::{Error, Result};

/// Model used with the OpenAI backend when the configured one is the Ollama default.
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Longest input sent to an embedding endpoint, in bytes.
const MAX_EMBED_INPUT: usize = 8000;

/// Service that turns a query into a vector.
pub enum EmbeddingBackend {
    Ollama {
        client: OllamaClient,
        model: String,
    },
    OpenAi {
        client: OpenAIClient<OpenAIConfig>,
        model: String,
    },
}

impl EmbeddingBackend {
    pub fn ollama(client: OllamaClient, model: impl Into<String>) -> Self {
        EmbeddingBackend::Ollama {
            client,
            model: model.into(),
        }
    }

    /// OpenAI backend keyed by `OPENAI_API_KEY`.
    pub fn openai(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::ConfigError("OPENAI_API_KEY not set".to_string()))?;

        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(EmbeddingBackend::OpenAi {
            client: OpenAIClient::with_config(config),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match config.embedding.provider {
            EmbeddingProvider::Ollama => {
                let client =
                    OllamaClient::with_url(&config.ollama.base_url, config.ollama_timeout())?;
                Ok(Self::ollama(client, &config.embedding.model))
            }
            EmbeddingProvider::OpenAi => {
                let model = if config.embedding.model == DEFAULT_EMBEDDING_MODEL {
                    OPENAI_EMBEDDING_MODEL
                } else {
                    config.embedding.model.as_str()
                };
                Self::openai(model)
            }
        }
    }

    pub fn model(&self) -> &str {
        match self {
            EmbeddingBackend::Ollama { model, .. } | EmbeddingBackend::OpenAi { model, .. } => {
                model
            }
        }
    }

    /// Embed one text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = truncate_input(text.trim());
        if input.is_empty() {
            return Err(Error::EmbeddingError("cannot embed empty text".to_string()));
        }

        debug!(model = self.model(), chars = input.len(), "Embedding query");

        match self {
            EmbeddingBackend::Ollama { client, model } => client.embed(input, model).await,
            EmbeddingBackend::OpenAi { client, model } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.as_str())
                    .input(EmbeddingInput::String(input.to_string()))
                    .build()?;

                let response = client.embeddings().create(request).await?;

                response
                    .data
                    .into_iter()
                    .next()
                    .map(|e| e.embedding)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| Error::EmbeddingError("No embedding returned".to_string()))
            }
        }
    }
}

impl std::fmt::Debug for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match self {
            EmbeddingBackend::Ollama { .. } => "ollama",
            EmbeddingBackend::OpenAi { .. } => "openai",
        };
        f.debug_struct("EmbeddingBackend")
            .field("provider", &provider)
            .field("model", &self.model())
            .finish()
    }
}

/// Cut at a char boundary at or below the byte limit.
fn truncate_input(text: &str) -> &str {
    if text.len() <= MAX_EMBED_INPUT {
        return text;
    }
    let mut end = MAX_EMBED_INPUT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
