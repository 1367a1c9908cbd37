use crate::errors::DomainResult;
use async_trait::async_trait;

/// Text generation capability; one implementation per backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Backend name for logs (`ollama`, `openai`)
    fn name(&self) -> &str;

    /// Condense an item rendering or a discussion into a short summary
    async fn summarize(&self, text: &str) -> DomainResult<String>;

    /// Produce advice text for a fully composed prompt
    async fn generate_advice(&self, prompt: &str) -> DomainResult<String>;
}

/// Embedding capability used by the retrieval index
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model; a change invalidates stored vectors
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;
}
