use crate::providers::{OllamaProvider, OpenAIProvider};
use anyhow::{anyhow, Context, Result};
use domain::config::{AiConfig, ProviderKind};
use domain::{Embedder, LanguageModel};
use std::sync::Arc;

/// The configured backend, seen through both capabilities
#[derive(Clone)]
pub struct AiBackend {
    pub model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
}

/// Factory for creating providers from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &AiConfig) -> Result<AiBackend> {
        let timeout = config.request_timeout();
        match config.provider {
            ProviderKind::Ollama => {
                let provider = Arc::new(
                    OllamaProvider::new(
                        config.ollama.base_url.clone(),
                        config.ollama.model.clone(),
                        config.ollama.embedding_model.clone(),
                    )
                    .and_then(|p| p.with_timeout(timeout))
                    .context("Failed to create Ollama provider")?,
                );
                tracing::info!(
                    provider = "ollama",
                    model = %config.ollama.model,
                    endpoint = %config.ollama.base_url,
                    "Language model backend ready"
                );
                Ok(AiBackend {
                    model: provider.clone(),
                    embedder: provider,
                })
            }
            ProviderKind::OpenAi => {
                let api_key = config
                    .openai
                    .api_key
                    .clone()
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| anyhow!("OpenAI API key is required"))?;

                let provider = Arc::new(
                    OpenAIProvider::new(
                        api_key,
                        config.openai.model.clone(),
                        config.openai.embedding_model.clone(),
                        config.openai.base_url.clone(),
                    )
                    .and_then(|p| p.with_timeout(timeout))
                    .context("Failed to create OpenAI provider")?,
                );
                tracing::info!(
                    provider = "openai",
                    model = %config.openai.model,
                    "Language model backend ready"
                );
                Ok(AiBackend {
                    model: provider.clone(),
                    embedder: provider,
                })
            }
        }
    }
}
