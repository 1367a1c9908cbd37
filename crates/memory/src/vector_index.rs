//! Embedded retrieval index
//!
//! Items are chunked, embedded through the configured [`Embedder`] and
//! ranked by cosine similarity. The whole index is one persisted record.
//! Unchanged items (same sha256 of their rendering) are never re-embedded,
//! and a different embedding model discards the stored vectors.

use crate::chunking::TextChunker;
use async_trait::async_trait;
use domain::{
    DomainResult, Embedder, IndexStats, ItemId, RetrievalDocument, RetrievalIndex,
    RetrievalMatch, StateRepository, StateRepositoryExt,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const RETRIEVAL_INDEX_KEY: &str = "retrieval_index";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    id: String,
    text: String,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedItem {
    content_hash: String,
    subject: String,
    chunks: Vec<IndexedChunk>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexState {
    embedding_model: String,
    items: HashMap<ItemId, IndexedItem>,
}

impl IndexState {
    fn empty(model: &str) -> Self {
        Self {
            embedding_model: model.to_string(),
            items: HashMap::new(),
        }
    }

    fn document_count(&self) -> usize {
        self.items.values().map(|item| item.chunks.len()).sum()
    }
}

pub struct VectorIndex {
    repo: Arc<dyn StateRepository>,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    pub async fn open(
        repo: Arc<dyn StateRepository>,
        embedder: Arc<dyn Embedder>,
        chunker: TextChunker,
    ) -> Self {
        let model = embedder.model().to_string();
        let state = match repo.load_json::<IndexState>(RETRIEVAL_INDEX_KEY).await {
            Ok(Some(state)) if state.embedding_model == model => {
                tracing::info!(
                    items = state.items.len(),
                    documents = state.document_count(),
                    "Retrieval index loaded"
                );
                state
            }
            Ok(Some(state)) => {
                tracing::warn!(
                    previous = %state.embedding_model,
                    current = %model,
                    "Embedding model changed, rebuilding retrieval index"
                );
                IndexState::empty(&model)
            }
            Ok(None) => IndexState::empty(&model),
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval index unreadable, starting empty");
                IndexState::empty(&model)
            }
        };

        Self {
            repo,
            embedder,
            chunker,
            state: RwLock::new(state),
        }
    }

    async fn persist(&self, state: &IndexState) -> DomainResult<()> {
        self.repo.save_json(RETRIEVAL_INDEX_KEY, state).await
    }

    async fn embed_document(&self, document: &RetrievalDocument) -> DomainResult<Vec<IndexedChunk>> {
        let texts = self.chunker.chunk(&document.text);
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embedder.embed(&texts).await?;
        Ok(texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(n, (text, vector))| IndexedChunk {
                id: format!("issue_{}_chunk_{}", document.item_id, n),
                text,
                vector,
            })
            .collect())
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cosine similarity; zero for empty or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl RetrievalIndex for VectorIndex {
    async fn upsert(&self, documents: Vec<RetrievalDocument>) -> DomainResult<usize> {
        let changed: Vec<(&RetrievalDocument, String)> = {
            let state = self.state.read().await;
            documents
                .iter()
                .map(|document| (document, content_hash(&document.text)))
                .filter(|(document, hash)| {
                    !state
                        .items
                        .get(&document.item_id)
                        .is_some_and(|existing| existing.content_hash == *hash)
                })
                .collect()
        };

        // No lock while embedding; queries keep running against the old state
        let mut fresh = Vec::with_capacity(changed.len());
        let mut failure = None;
        for (document, hash) in changed {
            match self.embed_document(document).await {
                Ok(chunks) => fresh.push((
                    document.item_id,
                    IndexedItem {
                        content_hash: hash,
                        subject: document.subject.clone(),
                        chunks,
                    },
                )),
                Err(e) => {
                    tracing::warn!(
                        item_id = document.item_id,
                        collaborator = "retrieval",
                        error = %e,
                        "Embedding failed, keeping progress so far"
                    );
                    failure = Some(e);
                    break;
                }
            }
        }

        let embedded = fresh.len();
        if embedded > 0 {
            let mut state = self.state.write().await;
            state.items.extend(fresh);
            let state = state.downgrade();
            self.persist(&state).await?;
        }
        if let Some(e) = failure {
            return Err(e);
        }

        tracing::debug!(
            received = documents.len(),
            embedded,
            "Retrieval documents upserted"
        );
        Ok(embedded)
    }

    async fn query(
        &self,
        text: &str,
        k: usize,
        exclude_item: Option<ItemId>,
    ) -> DomainResult<Vec<RetrievalMatch>> {
        if k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.state.read().await.items.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let state = self.state.read().await;
        let mut matches: Vec<RetrievalMatch> = state
            .items
            .iter()
            .filter(|(item_id, _)| Some(**item_id) != exclude_item)
            .filter_map(|(item_id, item)| {
                item.chunks
                    .iter()
                    .map(|chunk| (chunk, cosine_similarity(&query_vector, &chunk.vector)))
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(chunk, similarity)| RetrievalMatch {
                        item_id: *item_id,
                        subject: item.subject.clone(),
                        content: chunk.text.clone(),
                        similarity,
                    })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.item_id.cmp(&b.item_id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn retain(&self, item_ids: &[ItemId]) -> DomainResult<usize> {
        let keep: HashSet<ItemId> = item_ids.iter().copied().collect();
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|item_id, _| keep.contains(item_id));
        let removed = before - state.items.len();

        if removed > 0 {
            self.persist(&state).await?;
            tracing::info!(removed, "Stale items dropped from retrieval index");
        }
        Ok(removed)
    }

    async fn stats(&self) -> DomainResult<IndexStats> {
        let state = self.state.read().await;
        Ok(IndexStats {
            documents: state.document_count(),
            items: state.items.len(),
            embedding_model: state.embedding_model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::InMemoryStateStore;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Bag-of-letters embedding: texts sharing letters score higher. Texts
    /// containing "slow" take `slow_ms` to embed.
    struct LetterEmbedder {
        model: String,
        calls: AtomicUsize,
        slow_ms: AtomicU64,
    }

    impl LetterEmbedder {
        fn new(model: &str) -> Arc<Self> {
            Arc::new(Self {
                model: model.to_string(),
                calls: AtomicUsize::new(0),
                slow_ms: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn model(&self) -> &str {
            &self.model
        }

        async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.iter().any(|text| text.contains("slow")) {
                let delay = self.slow_ms.load(Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; 26];
                    for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn doc(item_id: ItemId, text: &str) -> RetrievalDocument {
        RetrievalDocument {
            item_id,
            text: text.to_string(),
            subject: format!("subject {item_id}"),
            status: "Closed".into(),
            priority: "Normal".into(),
            tracker: "Bug".into(),
            updated_on: "2024-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_unchanged_items_are_not_reembedded() {
        let repo = Arc::new(InMemoryStateStore::new());
        let embedder = LetterEmbedder::new("letters-v1");
        let index = VectorIndex::open(repo, embedder.clone(), TextChunker::new(1000, 200)).await;

        assert_eq!(index.upsert(vec![doc(1, "aaa"), doc(2, "bbb")]).await.unwrap(), 2);
        let calls = embedder.calls.load(Ordering::SeqCst);
        assert_eq!(index.upsert(vec![doc(1, "aaa"), doc(2, "bbb")]).await.unwrap(), 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls);

        assert_eq!(index.upsert(vec![doc(2, "bbc")]).await.unwrap(), 1);
        let stats = index.stats().await.unwrap();
        assert_eq!((stats.items, stats.documents), (2, 2));
    }

    #[tokio::test]
    async fn test_query_ranks_and_excludes() {
        let repo = Arc::new(InMemoryStateStore::new());
        let index = VectorIndex::open(
            repo,
            LetterEmbedder::new("letters-v1"),
            TextChunker::new(1000, 200),
        )
        .await;
        index
            .upsert(vec![doc(1, "database timeout"), doc(2, "zzz"), doc(3, "database time")])
            .await
            .unwrap();

        let hits = index.query("database timeout", 5, Some(1)).await.unwrap();
        assert_eq!(hits[0].item_id, 3);
        assert!(hits.iter().all(|hit| hit.item_id != 1));
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));

        assert_eq!(index.query("database", 1, None).await.unwrap().len(), 1);
        assert!(index.query("database", 0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_item_yields_one_match() {
        let repo = Arc::new(InMemoryStateStore::new());
        let index =
            VectorIndex::open(repo, LetterEmbedder::new("letters-v1"), TextChunker::new(4, 1)).await;
        index.upsert(vec![doc(7, "abcdabcdabcd")]).await.unwrap();

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.items, 1);
        assert!(stats.documents > 1);
        assert_eq!(index.query("abcd", 5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retain_drops_missing_items() {
        let repo = Arc::new(InMemoryStateStore::new());
        let index = VectorIndex::open(
            repo,
            LetterEmbedder::new("letters-v1"),
            TextChunker::new(1000, 200),
        )
        .await;
        index.upsert(vec![doc(1, "a"), doc(2, "b"), doc(3, "c")]).await.unwrap();

        assert_eq!(index.retain(&[1, 3]).await.unwrap(), 1);
        assert_eq!(index.retain(&[1, 3]).await.unwrap(), 0);
        assert_eq!(index.stats().await.unwrap().items, 2);
    }

    #[tokio::test]
    async fn test_model_change_rebuilds_from_scratch() {
        let repo = Arc::new(InMemoryStateStore::new());
        let index = VectorIndex::open(
            repo.clone(),
            LetterEmbedder::new("letters-v1"),
            TextChunker::new(1000, 200),
        )
        .await;
        index.upsert(vec![doc(1, "a")]).await.unwrap();

        let same = VectorIndex::open(
            repo.clone(),
            LetterEmbedder::new("letters-v1"),
            TextChunker::new(1000, 200),
        )
        .await;
        assert_eq!(same.stats().await.unwrap().items, 1);

        let changed = VectorIndex::open(
            repo,
            LetterEmbedder::new("letters-v2"),
            TextChunker::new(1000, 200),
        )
        .await;
        let stats = changed.stats().await.unwrap();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.embedding_model, "letters-v2");
    }

    #[tokio::test]
    async fn test_query_is_not_blocked_by_a_running_upsert() {
        let repo = Arc::new(InMemoryStateStore::new());
        let embedder = LetterEmbedder::new("letters-v1");
        let index = Arc::new(
            VectorIndex::open(repo, embedder.clone(), TextChunker::new(1000, 200)).await,
        );
        index.upsert(vec![doc(1, "database timeout")]).await.unwrap();

        embedder.slow_ms.store(600, Ordering::SeqCst);
        let upsert = tokio::spawn({
            let index = index.clone();
            async move {
                index
                    .upsert(vec![doc(2, "slow disk"), doc(3, "slow network")])
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let hits = index.query("database", 5, None).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(hits.len(), 1);
        assert!(!upsert.is_finished());

        assert_eq!(upsert.await.unwrap().unwrap(), 2);
        assert_eq!(index.stats().await.unwrap().items, 3);
    }
}
