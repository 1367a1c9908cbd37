//! Advice Generator
//!
//! summaries -> retrieval -> prompt -> language model -> guard re-check ->
//! post or stage. Shared by the polling job and the manual control surface.

use crate::guard::CommentGuard;
use domain::services::content;
use domain::{
    DomainResult, Item, ItemId, ItemSnapshot, LanguageModel, RetrievalIndex, RetrievalMatch, Tracker,
};
use memory::{AdviceStagingStore, PostOutcome, SummaryCache};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceOutcome {
    /// Comment posted directly to the tracker
    Posted,
    /// Staged for human approval
    Staged { pending_id: String },
    /// The item already carries an AI comment
    AlreadyAdvised,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub signature: String,
    pub top_k: usize,
    pub context_items: usize,
    /// Base URL used to build the item link in staged snapshots
    pub tracker_base_url: String,
}

pub struct AdviceGenerator {
    tracker: Arc<dyn Tracker>,
    retrieval: Arc<dyn RetrievalIndex>,
    model: Arc<dyn LanguageModel>,
    summaries: Arc<SummaryCache>,
    staging: Arc<AdviceStagingStore>,
    guard: CommentGuard,
    auto_advice: Arc<AtomicBool>,
    settings: GeneratorSettings,
}

impl AdviceGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tracker: Arc<dyn Tracker>,
        retrieval: Arc<dyn RetrievalIndex>,
        model: Arc<dyn LanguageModel>,
        summaries: Arc<SummaryCache>,
        staging: Arc<AdviceStagingStore>,
        auto_advice: Arc<AtomicBool>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            tracker,
            retrieval,
            model,
            summaries,
            staging,
            guard: CommentGuard::new(settings.signature.clone()),
            auto_advice,
            settings,
        }
    }

    pub fn guard(&self) -> &CommentGuard {
        &self.guard
    }

    /// Manual entry point: fetch the item fresh, then advise on it
    pub async fn generate_for_item(&self, id: ItemId, regenerate: bool) -> DomainResult<AdviceOutcome> {
        let item = self.tracker.item(id).await?;
        if regenerate {
            let dropped = self.summaries.invalidate(id).await?;
            debug!(item_id = id, dropped, "Summary cache entry invalidated for regeneration");
        }
        self.advise(&item).await
    }

    /// Generate advice for an item already in hand (polling batch)
    pub async fn advise(&self, item: &Item) -> DomainResult<AdviceOutcome> {
        if self.guard.is_guarded(item) {
            debug!(item_id = item.id, "Item already carries an AI comment");
            return Ok(AdviceOutcome::AlreadyAdvised);
        }

        let summaries = self.summaries.get_or_compute(item).await?;
        let matches = self.related_cases(item).await;
        let context = content::context_block(&matches, self.settings.context_items);
        let prompt = content::advice_prompt(item, &summaries, &context);

        let advice = self.model.generate_advice(&prompt).await?;
        let advice = advice.trim().to_string();

        if self.auto_advice.load(Ordering::Acquire) {
            self.post(item.id, &advice).await
        } else {
            let snapshot = ItemSnapshot::from_item(item, &self.settings.tracker_base_url);
            let pending_id = self.staging.stage(item.id, advice, snapshot).await?;
            Ok(AdviceOutcome::Staged { pending_id })
        }
    }

    async fn related_cases(&self, item: &Item) -> Vec<RetrievalMatch> {
        let query = content::render_item(item);
        match self
            .retrieval
            .query(&query, self.settings.top_k, Some(item.id))
            .await
        {
            Ok(matches) => {
                debug!(item_id = item.id, matches = matches.len(), "Related cases retrieved");
                matches
            }
            Err(e) => {
                warn!(
                    item_id = item.id,
                    operation = "retrieval_query",
                    category = e.category(),
                    error = %e,
                    "Retrieval failed, generating advice without past cases"
                );
                Vec::new()
            }
        }
    }

    /// Guard re-check and post run inside the staging store, serialized
    /// with approvals of staged advice
    async fn post(&self, item_id: ItemId, advice: &str) -> DomainResult<AdviceOutcome> {
        match self.staging.post_direct(item_id, advice).await? {
            PostOutcome::Posted => {
                info!(item_id, "Advice posted");
                Ok(AdviceOutcome::Posted)
            }
            PostOutcome::AlreadyAdvised => {
                info!(item_id, "AI comment appeared while generating, not posting");
                Ok(AdviceOutcome::AlreadyAdvised)
            }
        }
    }
}
