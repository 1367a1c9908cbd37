use domain::{Collaborator, DomainError};
use std::time::Duration;

mod ollama_provider;
mod openai_provider;

pub use ollama_provider::OllamaProvider;
pub use openai_provider::OpenAIProvider;

/// Sampling parameters per kind of request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationOptions {
    /// Short, deterministic summaries
    pub const SUMMARY: Self = Self {
        max_tokens: 512,
        temperature: 0.2,
    };

    pub const ADVICE: Self = Self {
        max_tokens: 2048,
        temperature: 0.7,
    };
}

/// Map a transport failure to the domain taxonomy
pub(crate) fn request_error(operation: &str, timeout: Duration, e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::Timeout {
            collaborator: Collaborator::LanguageModel,
            operation: operation.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        DomainError::unavailable(Collaborator::LanguageModel, format!("{operation}: {e}"))
    }
}

/// Turn a non-success response into an error carrying the body
pub(crate) async fn status_error(operation: &str, response: reqwest::Response) -> DomainError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(operation, %status, body = %body, "Language model API error");
    DomainError::unavailable(
        Collaborator::LanguageModel,
        format!("{operation}: HTTP {status}: {body}"),
    )
}

pub(crate) fn non_empty(text: String) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(DomainError::EmptyResponse {
            collaborator: Collaborator::LanguageModel,
        })
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}
