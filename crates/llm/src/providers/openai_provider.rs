use super::{http_client, non_empty, request_error, status_error, GenerationOptions};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use domain::{Collaborator, DomainError, DomainResult, Embedder, LanguageModel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// OpenAI or any OpenAI-compatible server
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    embedding_model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        model: String,
        embedding_model: String,
        endpoint: Option<String>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!("OpenAI API key cannot be empty"));
        }

        let timeout = Duration::from_secs(60);
        Ok(Self {
            api_key,
            model,
            embedding_model,
            endpoint: endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client: http_client(timeout)?,
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = timeout;
        self.client = http_client(timeout)?;
        Ok(self)
    }

    async fn chat(&self, operation: &str, prompt: &str, options: GenerationOptions) -> DomainResult<String> {
        let start_time = Instant::now();
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
            stream: Some(false),
        };

        debug!(operation, model = %self.model, prompt_chars = prompt.chars().count(), "Sending request to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(operation, self.timeout, e))?;

        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }

        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| request_error(operation, self.timeout, e))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        info!(
            operation,
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            total_tokens = body.usage.map(|u| u.prompt_tokens + u.completion_tokens).unwrap_or(0),
            "Received response from OpenAI"
        );
        non_empty(content)
    }
}

#[async_trait]
impl LanguageModel for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, text: &str) -> DomainResult<String> {
        self.chat("summarize", text, GenerationOptions::SUMMARY).await
    }

    async fn generate_advice(&self, prompt: &str) -> DomainResult<String> {
        self.chat("generate_advice", prompt, GenerationOptions::ADVICE).await
    }
}

#[async_trait]
impl Embedder for OpenAIProvider {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| request_error("embed", self.timeout, e))?;

        if !response.status().is_success() {
            return Err(status_error("embed", response).await);
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| request_error("embed", self.timeout, e))?;

        if body.data.len() != texts.len() {
            return Err(DomainError::unavailable(
                Collaborator::LanguageModel,
                format!(
                    "embed: expected {} embeddings, got {}",
                    texts.len(),
                    body.data.len()
                ),
            ));
        }
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

// OpenAI-specific request/response types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn provider(url: String) -> OpenAIProvider {
        OpenAIProvider::new(
            "test-api-key".to_string(),
            "gpt-4o-mini".to_string(),
            "text-embedding-3-small".to_string(),
            Some(url),
        )
        .unwrap()
    }

    #[test]
    fn test_openai_provider_requires_key() {
        let result = OpenAIProvider::new(
            String::new(),
            "gpt-4o-mini".to_string(),
            "text-embedding-3-small".to_string(),
            None,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_openai_advice_mock_response() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "How do I fix it?"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "choices": [{
                    "message": {"role": "assistant", "content": "  Check the logs first.  "},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5}
            }"#,
            )
            .create_async()
            .await;

        let advice = provider(server.url())
            .generate_advice("How do I fix it?")
            .await
            .unwrap();
        assert_eq!(advice, "Check the logs first.");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_empty_completion_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "   "}}]}"#)
            .create_async()
            .await;

        let err = provider(server.url()).summarize("text").await.unwrap_err();
        assert_eq!(err.category(), "empty_response");
    }

    #[tokio::test]
    async fn test_openai_api_error_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "rate limited"}}"#)
            .create_async()
            .await;

        let err = provider(server.url()).summarize("text").await.unwrap_err();
        assert_eq!(err.category(), "collaborator_unavailable");
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_openai_embeddings_are_ordered_by_index() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["a", "b"]
            })))
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]}"#,
            )
            .create_async()
            .await;

        let vectors = provider(server.url())
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }
}
