//! Shared doubles for the application tests
#![allow(dead_code)]

use application::{AgentService, Collaborators};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::config::AgentConfig;
use domain::{
    Checkpoint, Collaborator, DomainError, DomainResult, IndexStats, Item, ItemId, ItemPage,
    Journal, LanguageModel, RetrievalDocument, RetrievalIndex, RetrievalMatch, StateRepositoryExt,
    Tracker,
};
use memory::checkpoint::CHECKPOINT_KEY;
use memory::InMemoryStateStore;
use mockall::mock;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const SIGNATURE: &str = "AI自動アドバイス";
pub const BASE_URL: &str = "http://redmine.local";

mock! {
    pub Model {}

    #[async_trait]
    impl LanguageModel for Model {
        fn name(&self) -> &str;
        async fn summarize(&self, text: &str) -> DomainResult<String>;
        async fn generate_advice(&self, prompt: &str) -> DomainResult<String>;
    }
}

/// Model that summarizes and advises with fixed text
pub fn advising_model(advice: &'static str) -> MockModel {
    let mut model = MockModel::new();
    model
        .expect_summarize()
        .returning(|_| Ok("summary".to_string()));
    model
        .expect_generate_advice()
        .returning(move |_| Ok(advice.to_string()));
    model
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn item(id: ItemId, created_on: DateTime<Utc>) -> Item {
    Item {
        id,
        subject: format!("Issue {id}"),
        description: format!("Steps to reproduce {id}"),
        status: "New".into(),
        priority: "Normal".into(),
        project: "Web".into(),
        tracker: "Bug".into(),
        author: Some("alice".into()),
        created_on,
        updated_on: created_on,
        journals: Vec::new(),
    }
}

pub fn with_note(mut item: Item, notes: &str) -> Item {
    item.journals.push(Journal {
        id: item.journals.len() as u64 + 1,
        author: Some("bob".into()),
        notes: Some(notes.into()),
        created_on: Some(item.updated_on),
    });
    item
}

/// In-memory tracker recording every comment; a posted comment becomes a journal.
///
/// Like Redmine's `/issues.json`, list results carry no journals unless
/// `list_journals` is set; `item` always returns them.
#[derive(Default)]
pub struct FakeTracker {
    items: Mutex<BTreeMap<ItemId, Item>>,
    posts: Mutex<Vec<(ItemId, String)>>,
    pub fail_posts: AtomicBool,
    pub list_journals: AtomicBool,
    pub page_delay_ms: AtomicUsize,
    pub page_calls: AtomicUsize,
    /// Added to the reported total, as if items vanished mid-walk
    pub phantom_items: AtomicUsize,
}

impl FakeTracker {
    pub fn with_items(items: Vec<Item>) -> Self {
        let tracker = Self::default();
        for item in items {
            tracker.insert(item);
        }
        tracker
    }

    pub fn insert(&self, item: Item) {
        self.items.lock().insert(item.id, item);
    }

    /// A note written by someone other than this agent
    pub fn add_note(&self, id: ItemId, notes: &str) {
        let mut items = self.items.lock();
        if let Some(stored) = items.remove(&id) {
            items.insert(id, with_note(stored, notes));
        }
    }

    fn listed(&self, item: &Item) -> Item {
        let mut listed = item.clone();
        if !self.list_journals.load(Ordering::SeqCst) {
            listed.journals.clear();
        }
        listed
    }

    pub fn posts(&self) -> Vec<(ItemId, String)> {
        self.posts.lock().clone()
    }

    pub fn posts_for(&self, id: ItemId) -> usize {
        self.posts.lock().iter().filter(|(item_id, _)| *item_id == id).count()
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn items_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<Item>> {
        let mut items: Vec<Item> = self
            .items
            .lock()
            .values()
            .filter(|item| item.created_on >= since)
            .map(|item| self.listed(item))
            .collect();
        items.sort_by_key(|item| item.created_on);
        Ok(items)
    }

    async fn item(&self, id: ItemId) -> DomainResult<Item> {
        self.items
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("item", id))
    }

    async fn post_comment(&self, id: ItemId, text: &str) -> DomainResult<()> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(DomainError::unavailable(Collaborator::Tracker, "HTTP 503"));
        }
        let mut items = self.items.lock();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("item", id))?;
        item.journals.push(Journal {
            id: item.journals.len() as u64 + 1,
            author: Some("agent".into()),
            notes: Some(text.to_string()),
            created_on: Some(Utc::now()),
        });
        item.updated_on = Utc::now();
        self.posts.lock().push((id, text.to_string()));
        Ok(())
    }

    async fn items_page(&self, offset: usize, limit: usize) -> DomainResult<ItemPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.page_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        let items = self.items.lock();
        Ok(ItemPage {
            items: items
                .values()
                .skip(offset)
                .take(limit)
                .map(|item| self.listed(item))
                .collect(),
            total_count: items.len() + self.phantom_items.load(Ordering::SeqCst),
        })
    }
}

/// Retrieval double recording upserts and retains
#[derive(Default)]
pub struct RecordingRetrieval {
    pub upserts: Mutex<Vec<Vec<ItemId>>>,
    pub texts: Mutex<BTreeMap<ItemId, String>>,
    pub retained: Mutex<Option<Vec<ItemId>>>,
    pub matches: Mutex<Vec<RetrievalMatch>>,
    pub fail_queries: AtomicBool,
}

#[async_trait]
impl RetrievalIndex for RecordingRetrieval {
    async fn upsert(&self, documents: Vec<RetrievalDocument>) -> DomainResult<usize> {
        let ids: Vec<ItemId> = documents.iter().map(|d| d.item_id).collect();
        let count = ids.len();
        self.texts
            .lock()
            .extend(documents.into_iter().map(|d| (d.item_id, d.text)));
        self.upserts.lock().push(ids);
        Ok(count)
    }

    async fn query(
        &self,
        _text: &str,
        k: usize,
        exclude_item: Option<ItemId>,
    ) -> DomainResult<Vec<RetrievalMatch>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DomainError::unavailable(Collaborator::Retrieval, "embedding backend down"));
        }
        Ok(self
            .matches
            .lock()
            .iter()
            .filter(|m| Some(m.item_id) != exclude_item)
            .take(k)
            .cloned()
            .collect())
    }

    async fn retain(&self, item_ids: &[ItemId]) -> DomainResult<usize> {
        *self.retained.lock() = Some(item_ids.to_vec());
        Ok(0)
    }

    async fn stats(&self) -> DomainResult<IndexStats> {
        let items = self.upserts.lock().iter().flatten().count();
        Ok(IndexStats {
            documents: items,
            items,
            embedding_model: "recording".into(),
        })
    }
}

pub struct Harness {
    pub service: Arc<AgentService>,
    pub tracker: Arc<FakeTracker>,
    pub retrieval: Arc<RecordingRetrieval>,
    pub state: Arc<InMemoryStateStore>,
}

pub fn config(auto_advice: bool) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.tracker.url = BASE_URL.into();
    config.tracker.page_size = 2;
    config.advice.auto_advice_enabled = auto_advice;
    config.advice.signature = SIGNATURE.into();
    config
}

/// Agent over fresh doubles with the checkpoint seeded at `t0()`
pub async fn harness(model: MockModel, auto_advice: bool, items: Vec<Item>) -> Harness {
    let state = Arc::new(InMemoryStateStore::new());
    state
        .save_json(CHECKPOINT_KEY, &Checkpoint::new(t0()))
        .await
        .unwrap();
    let tracker = Arc::new(FakeTracker::with_items(items));
    let retrieval = Arc::new(RecordingRetrieval::default());
    let service = reopen(&state, &tracker, &retrieval, model, auto_advice).await;
    Harness {
        service,
        tracker,
        retrieval,
        state,
    }
}

/// A second agent process over the same persisted state and tracker
pub async fn reopen(
    state: &Arc<InMemoryStateStore>,
    tracker: &Arc<FakeTracker>,
    retrieval: &Arc<RecordingRetrieval>,
    model: MockModel,
    auto_advice: bool,
) -> Arc<AgentService> {
    Arc::new(
        AgentService::open(
            &config(auto_advice),
            Collaborators {
                tracker: tracker.clone(),
                tracker_base_url: BASE_URL.into(),
                retrieval: retrieval.clone(),
                model: Arc::new(model),
                state: state.clone(),
            },
        )
        .await,
    )
}
