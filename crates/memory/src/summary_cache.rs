//! Summary cache
//!
//! Memoizes the content and discussion summaries of an item, keyed by
//! `SummaryEntry::signature_of`. A hit costs zero language-model calls.

use chrono::Utc;
use domain::services::content::{
    content_summary_prompt, discussion_summary_prompt, render_discussion, render_item,
};
use domain::{
    DomainResult, Item, ItemId, ItemSummaries, LanguageModel, StateRepository,
    StateRepositoryExt, SummaryEntry,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const SUMMARY_CACHE_KEY: &str = "summary_cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub storage_path: String,
}

pub struct SummaryCache {
    repo: Arc<dyn StateRepository>,
    model: Arc<dyn LanguageModel>,
    /// AI signature; signed notes never feed a discussion summary
    signature: String,
    entries: Mutex<HashMap<ItemId, SummaryEntry>>,
}

impl SummaryCache {
    /// Load persisted entries; an unreadable record starts empty
    pub async fn open(
        repo: Arc<dyn StateRepository>,
        model: Arc<dyn LanguageModel>,
        signature: impl Into<String>,
    ) -> Self {
        let entries = match repo
            .load_json::<HashMap<ItemId, SummaryEntry>>(SUMMARY_CACHE_KEY)
            .await
        {
            Ok(Some(entries)) => {
                tracing::debug!(entries = entries.len(), "Summary cache loaded");
                entries
            }
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Summary cache unreadable, starting empty");
                HashMap::new()
            }
        };

        Self {
            repo,
            model,
            signature: signature.into(),
            entries: Mutex::new(entries),
        }
    }

    /// Replace the cached entries with the persisted record
    async fn refresh(&self, entries: &mut HashMap<ItemId, SummaryEntry>) {
        match self
            .repo
            .load_json::<HashMap<ItemId, SummaryEntry>>(SUMMARY_CACHE_KEY)
            .await
        {
            Ok(Some(persisted)) => *entries = persisted,
            Ok(None) => entries.clear(),
            Err(e) => tracing::warn!(error = %e, "Summary cache unreadable, using last known entries"),
        }
    }

    pub async fn get_or_compute(&self, item: &Item) -> DomainResult<ItemSummaries> {
        let signature = SummaryEntry::signature_of(item);
        {
            let mut entries = self.entries.lock().await;
            self.refresh(&mut entries).await;
            if let Some(entry) = entries.get(&item.id) {
                if entry.content_signature == signature {
                    tracing::debug!(item_id = item.id, "Summary cache hit");
                    return Ok(entry.summaries());
                }
            }
        }

        tracing::debug!(item_id = item.id, "Summary cache miss, summarizing");
        let content_summary = self
            .model
            .summarize(&content_summary_prompt(&render_item(item)))
            .await?;

        let journal_summary = if item.has_journals() {
            match render_discussion(item, &self.signature) {
                Some(discussion) => Some(
                    self.model
                        .summarize(&discussion_summary_prompt(&discussion))
                        .await?,
                ),
                None => None,
            }
        } else {
            None
        };

        let entry = SummaryEntry {
            item_id: item.id,
            content_signature: signature,
            content_summary,
            journal_summary,
            journal_count: item.journal_count(),
            updated_at: Utc::now(),
        };
        let summaries = entry.summaries();

        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(SUMMARY_CACHE_KEY).await?;
        self.refresh(&mut entries).await;
        let mut next = entries.clone();
        next.insert(item.id, entry);
        self.repo.save_json(SUMMARY_CACHE_KEY, &next).await?;
        *entries = next;

        Ok(summaries)
    }

    /// Drop one entry; returns whether it existed
    pub async fn invalidate(&self, item_id: ItemId) -> DomainResult<bool> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(SUMMARY_CACHE_KEY).await?;
        self.refresh(&mut entries).await;
        if !entries.contains_key(&item_id) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(&item_id);
        self.repo.save_json(SUMMARY_CACHE_KEY, &next).await?;
        *entries = next;
        tracing::info!(item_id, "Summary cache entry invalidated");
        Ok(true)
    }

    pub async fn stats(&self) -> CacheStats {
        let mut entries = self.entries.lock().await;
        self.refresh(&mut entries).await;
        CacheStats {
            count: entries.len(),
            storage_path: self.repo.location(SUMMARY_CACHE_KEY),
        }
    }

    /// Remove every entry; returns how many were dropped
    pub async fn clear(&self) -> DomainResult<usize> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(SUMMARY_CACHE_KEY).await?;
        self.refresh(&mut entries).await;
        let removed = entries.len();
        self.repo
            .save_json(SUMMARY_CACHE_KEY, &HashMap::<ItemId, SummaryEntry>::new())
            .await?;
        entries.clear();
        tracing::info!(removed, "Summary cache cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::InMemoryStateStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use domain::Journal;
    use mockall::mock;

    mock! {
        Model {}

        #[async_trait]
        impl LanguageModel for Model {
            fn name(&self) -> &str;
            async fn summarize(&self, text: &str) -> DomainResult<String>;
            async fn generate_advice(&self, prompt: &str) -> DomainResult<String>;
        }
    }

    fn item(journals: Vec<Journal>) -> Item {
        let now = Utc::now();
        Item {
            id: 11,
            subject: "Nightly backup fails".into(),
            description: "Disk full on the backup host".into(),
            status: "New".into(),
            priority: "High".into(),
            project: "Ops".into(),
            tracker: "Bug".into(),
            author: None,
            created_on: now,
            updated_on: now,
            journals,
        }
    }

    fn note(id: u64, text: &str) -> Journal {
        Journal {
            id,
            author: Some("carol".into()),
            notes: Some(text.into()),
            created_on: None,
        }
    }

    async fn cache_with(model: MockModel) -> (SummaryCache, Arc<InMemoryStateStore>) {
        let repo = Arc::new(InMemoryStateStore::new());
        let cache = SummaryCache::open(repo.clone(), Arc::new(model), "AI-SIG").await;
        (cache, repo)
    }

    #[tokio::test]
    async fn test_unchanged_item_is_summarized_once() {
        let mut model = MockModel::new();
        model
            .expect_summarize()
            .times(1)
            .returning(|_| Ok("content summary".into()));
        let (cache, _) = cache_with(model).await;
        let item = item(vec![]);

        let first = cache.get_or_compute(&item).await.unwrap();
        let second = cache.get_or_compute(&item).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.journal_summary, None);
    }

    #[tokio::test]
    async fn test_changed_updated_on_recomputes_once() {
        let mut model = MockModel::new();
        model
            .expect_summarize()
            .times(2)
            .returning(|_| Ok("summary".into()));
        let (cache, _) = cache_with(model).await;
        let mut item = item(vec![]);

        cache.get_or_compute(&item).await.unwrap();
        item.updated_on = item.updated_on + Duration::minutes(1);
        cache.get_or_compute(&item).await.unwrap();
        cache.get_or_compute(&item).await.unwrap();
    }

    #[tokio::test]
    async fn test_discussion_summarized_separately_without_ai_notes() {
        let mut model = MockModel::new();
        model
            .expect_summarize()
            .withf(|text| text.contains("[carol] disk cleaned"))
            .times(1)
            .returning(|_| Ok("discussion".into()));
        model
            .expect_summarize()
            .withf(|text| !text.contains("[carol]"))
            .times(1)
            .returning(|_| Ok("content".into()));
        let (cache, _) = cache_with(model).await;

        let summaries = cache
            .get_or_compute(&item(vec![note(1, "AI-SIG:\n\nold advice"), note(2, "disk cleaned")]))
            .await
            .unwrap();
        assert_eq!(summaries.content_summary, "content");
        assert_eq!(summaries.journal_summary.as_deref(), Some("discussion"));
    }

    #[tokio::test]
    async fn test_entries_survive_reopen_and_invalidate() {
        let mut model = MockModel::new();
        model
            .expect_summarize()
            .times(1)
            .returning(|_| Ok("content".into()));
        let (cache, repo) = cache_with(model).await;
        let item = item(vec![]);
        cache.get_or_compute(&item).await.unwrap();

        let mut idle = MockModel::new();
        idle.expect_summarize().never();
        let reopened = SummaryCache::open(repo.clone(), Arc::new(idle), "AI-SIG").await;
        assert_eq!(reopened.get_or_compute(&item).await.unwrap().content_summary, "content");
        assert_eq!(reopened.stats().await.count, 1);

        assert!(reopened.invalidate(item.id).await.unwrap());
        assert!(!reopened.invalidate(item.id).await.unwrap());
        assert_eq!(reopened.stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_summarizer_failure_leaves_cache_untouched() {
        let mut model = MockModel::new();
        model.expect_summarize().times(1).returning(|_| {
            Err(domain::DomainError::unavailable(
                domain::Collaborator::LanguageModel,
                "connection refused",
            ))
        });
        let (cache, _) = cache_with(model).await;

        assert!(cache.get_or_compute(&item(vec![])).await.is_err());
        assert_eq!(cache.stats().await.count, 0);
    }

    #[tokio::test]
    async fn test_clear_reports_removed_count() {
        let mut model = MockModel::new();
        model.expect_summarize().returning(|_| Ok("s".into()));
        let (cache, _) = cache_with(model).await;
        cache.get_or_compute(&item(vec![])).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 1);
        assert_eq!(cache.stats().await.count, 0);
        assert_eq!(cache.stats().await.storage_path, "memory://summary_cache");
    }

    #[tokio::test]
    async fn test_entries_written_by_another_owner_are_kept() {
        let repo = Arc::new(InMemoryStateStore::new());
        let mut model = MockModel::new();
        model.expect_summarize().returning(|_| Ok("s".into()));
        let model = Arc::new(model);
        let daemon = SummaryCache::open(repo.clone(), model.clone(), "AI-SIG").await;
        let cli = SummaryCache::open(repo.clone(), model, "AI-SIG").await;

        let mut first = item(vec![]);
        first.id = 1;
        let mut second = item(vec![]);
        second.id = 2;
        daemon.get_or_compute(&first).await.unwrap();
        cli.get_or_compute(&second).await.unwrap();
        assert_eq!(daemon.stats().await.count, 2);

        assert_eq!(cli.clear().await.unwrap(), 2);
        assert_eq!(daemon.stats().await.count, 0);
        assert!(!daemon.invalidate(1).await.unwrap());
    }
}
