//! Builds the agent from configuration

use anyhow::{Context, Result};
use application::{AgentService, Collaborators};
use domain::config::AgentConfig;
use infrastructure::RedmineClient;
use llm::ProviderFactory;
use memory::{JsonFileStore, TextChunker, VectorIndex};
use std::sync::Arc;

pub async fn build_service(config: &AgentConfig) -> Result<Arc<AgentService>> {
    let tracker = RedmineClient::new(&config.tracker).context("Failed to create Redmine client")?;
    let tracker_base_url = tracker.base_url().to_string();
    let backend = ProviderFactory::create(&config.ai)?;

    let state = Arc::new(JsonFileStore::new(config.storage.data_dir.clone()));
    let retrieval = VectorIndex::open(
        state.clone(),
        backend.embedder,
        TextChunker::new(config.retrieval.chunk_size, config.retrieval.chunk_overlap),
    )
    .await;

    let service = AgentService::open(
        config,
        Collaborators {
            tracker: Arc::new(tracker),
            tracker_base_url,
            retrieval: Arc::new(retrieval),
            model: backend.model,
            state,
        },
    )
    .await;

    tracing::debug!(data_dir = %config.storage.data_dir.display(), "Agent service ready");
    Ok(Arc::new(service))
}
