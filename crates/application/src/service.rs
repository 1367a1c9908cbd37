//! Control facade used by the CLI and the runtime
//!
//! Every manual trigger goes through the same components and gates as the
//! scheduled jobs.

use crate::advice_generator::{AdviceGenerator, AdviceOutcome, GeneratorSettings};
use crate::errors::{ApplicationError, ApplicationResult};
use crate::jobs::{IssuePollingJob, KnowledgeUpdateJob, PollReport, UpdateReport};
use common::TickGate;
use domain::config::AgentConfig;
use domain::{
    IndexStats, ItemId, LanguageModel, PendingAdvice, RetrievalIndex, RetrievalMatch,
    StateRepository, Tracker,
};
use memory::{AdviceStagingStore, Approval, CacheStats, CheckpointStore, SummaryCache};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub const KNOWLEDGE_JOB: &str = "knowledge_update";
pub const POLLING_JOB: &str = "issue_polling";

/// External collaborators the agent is built from
pub struct Collaborators {
    pub tracker: Arc<dyn Tracker>,
    pub tracker_base_url: String,
    pub retrieval: Arc<dyn RetrievalIndex>,
    pub model: Arc<dyn LanguageModel>,
    pub state: Arc<dyn StateRepository>,
}

pub struct AgentService {
    generator: Arc<AdviceGenerator>,
    staging: Arc<AdviceStagingStore>,
    summaries: Arc<SummaryCache>,
    checkpoint: Arc<CheckpointStore>,
    retrieval: Arc<dyn RetrievalIndex>,
    knowledge: Arc<KnowledgeUpdateJob>,
    polling: Arc<IssuePollingJob>,
    knowledge_gate: TickGate,
    polling_gate: TickGate,
    auto_advice: Arc<AtomicBool>,
}

impl AgentService {
    /// Open the persisted stores and wire every component
    pub async fn open(config: &AgentConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            tracker,
            tracker_base_url,
            retrieval,
            model,
            state,
        } = collaborators;
        let signature = config.advice.signature.clone();

        let checkpoint = Arc::new(CheckpointStore::open(state.clone()).await);
        let summaries = Arc::new(SummaryCache::open(state.clone(), model.clone(), signature.clone()).await);
        let staging =
            Arc::new(AdviceStagingStore::open(state, tracker.clone(), signature.clone()).await);
        let auto_advice = Arc::new(AtomicBool::new(config.advice.auto_advice_enabled));

        let generator = Arc::new(AdviceGenerator::new(
            tracker.clone(),
            retrieval.clone(),
            model,
            summaries.clone(),
            staging.clone(),
            auto_advice.clone(),
            GeneratorSettings {
                signature,
                top_k: config.advice.top_k,
                context_items: config.advice.context_items,
                tracker_base_url,
            },
        ));

        let knowledge = Arc::new(KnowledgeUpdateJob::new(
            tracker.clone(),
            retrieval.clone(),
            config.tracker.page_size as usize,
        ));
        let polling = Arc::new(IssuePollingJob::new(
            tracker,
            checkpoint.clone(),
            staging.clone(),
            generator.clone(),
        ));

        Self {
            generator,
            staging,
            summaries,
            checkpoint,
            retrieval,
            knowledge,
            polling,
            knowledge_gate: TickGate::new(),
            polling_gate: TickGate::new(),
            auto_advice,
        }
    }

    pub(crate) fn knowledge_job(&self) -> (Arc<KnowledgeUpdateJob>, TickGate) {
        (self.knowledge.clone(), self.knowledge_gate.clone())
    }

    pub(crate) fn polling_job(&self) -> (Arc<IssuePollingJob>, TickGate) {
        (self.polling.clone(), self.polling_gate.clone())
    }

    /// Run the knowledge update now; refused while a run is in progress
    pub async fn trigger_update(&self) -> ApplicationResult<UpdateReport> {
        let _permit = self
            .knowledge_gate
            .try_enter()
            .ok_or(ApplicationError::JobBusy { job: KNOWLEDGE_JOB })?;
        self.knowledge.run_once().await
    }

    /// Run one polling pass now; refused while a run is in progress
    pub async fn trigger_poll(&self) -> ApplicationResult<PollReport> {
        let _permit = self
            .polling_gate
            .try_enter()
            .ok_or(ApplicationError::JobBusy { job: POLLING_JOB })?;
        self.polling.run_once().await
    }

    /// Generate advice for one item; `regenerate` drops its cached summaries first
    pub async fn generate_advice(
        &self,
        item_id: ItemId,
        regenerate: bool,
    ) -> ApplicationResult<AdviceOutcome> {
        Ok(self.generator.generate_for_item(item_id, regenerate).await?)
    }

    pub async fn list_pending(&self) -> Vec<PendingAdvice> {
        self.staging.list().await
    }

    /// Post staged advice unless the item was advised in the meantime
    pub async fn approve(&self, pending_id: &str) -> ApplicationResult<Approval> {
        Ok(self.staging.approve(pending_id).await?)
    }

    pub async fn reject(&self, pending_id: &str) -> ApplicationResult<PendingAdvice> {
        Ok(self.staging.reject(pending_id).await?)
    }

    pub async fn clear_pending(&self) -> ApplicationResult<usize> {
        Ok(self.staging.clear().await?)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.summaries.stats().await
    }

    pub async fn clear_cache(&self) -> ApplicationResult<usize> {
        Ok(self.summaries.clear().await?)
    }

    pub fn auto_advice(&self) -> bool {
        self.auto_advice.load(Ordering::Acquire)
    }

    pub fn set_auto_advice(&self, enabled: bool) {
        let previous = self.auto_advice.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "Auto-advice toggled");
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> ApplicationResult<Vec<RetrievalMatch>> {
        Ok(self.retrieval.query(query, limit, None).await?)
    }

    pub async fn index_stats(&self) -> ApplicationResult<IndexStats> {
        Ok(self.retrieval.stats().await?)
    }

    pub async fn checkpoint(&self) -> chrono::DateTime<chrono::Utc> {
        self.checkpoint.boundary().await
    }
}
