use super::{http_client, non_empty, request_error, status_error, GenerationOptions};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use domain::{DomainResult, Embedder, LanguageModel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    embedding_model: String,
    client: Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(endpoint: String, model: String, embedding_model: String) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(anyhow!("Ollama endpoint cannot be empty"));
        }

        // Local models can be slow
        let timeout = Duration::from_secs(120);
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            embedding_model,
            client: http_client(timeout)?,
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.timeout = timeout;
        self.client = http_client(timeout)?;
        Ok(self)
    }

    async fn generate(&self, operation: &str, prompt: &str, options: GenerationOptions) -> DomainResult<String> {
        let start_time = Instant::now();
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };

        debug!(operation, model = %self.model, "Sending request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(operation, self.timeout, e))?;

        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| request_error(operation, self.timeout, e))?;

        info!(
            operation,
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Received response from Ollama"
        );
        non_empty(body.response)
    }
}

#[async_trait]
impl LanguageModel for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn summarize(&self, text: &str) -> DomainResult<String> {
        self.generate("summarize", text, GenerationOptions::SUMMARY).await
    }

    async fn generate_advice(&self, prompt: &str) -> DomainResult<String> {
        self.generate("generate_advice", prompt, GenerationOptions::ADVICE).await
    }
}

#[async_trait]
impl Embedder for OllamaProvider {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    /// One request per text; the endpoint embeds a single prompt
    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let response = self
                .client
                .post(format!("{}/api/embeddings", self.endpoint))
                .json(&EmbeddingRequest {
                    model: &self.embedding_model,
                    prompt: text,
                })
                .send()
                .await
                .map_err(|e| request_error("embed", self.timeout, e))?;

            if !response.status().is_success() {
                return Err(status_error("embed", response).await);
            }

            let body: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| request_error("embed", self.timeout, e))?;
            vectors.push(body.embedding);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}
