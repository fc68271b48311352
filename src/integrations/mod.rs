//! External integrations module.
//!
//! Provides the language-model seam used by entity extraction and the
//! Ollama client backing it (completions, embeddings, liveness).

use async_trait::async_trait;

use crate::Result;

pub mod ollama;

pub use ollama::{OllamaClient, OllamaLanguageModel};

/// Single-shot text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
