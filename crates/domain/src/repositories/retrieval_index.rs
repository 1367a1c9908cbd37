use crate::entities::{ItemId, RetrievalDocument, RetrievalMatch};
use crate::errors::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub items: usize,
    pub embedding_model: String,
}

/// Similarity search over past items
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Insert or replace documents; re-ingesting an item overwrites it.
    /// Returns how many items were (re)embedded.
    async fn upsert(&self, documents: Vec<RetrievalDocument>) -> DomainResult<usize>;

    /// Ranked matches, best first, never containing `exclude_item`
    async fn query(
        &self,
        text: &str,
        k: usize,
        exclude_item: Option<ItemId>,
    ) -> DomainResult<Vec<RetrievalMatch>>;

    /// Drop every item not in `item_ids`; returns how many were dropped
    async fn retain(&self, item_ids: &[ItemId]) -> DomainResult<usize>;

    async fn stats(&self) -> DomainResult<IndexStats>;
}
