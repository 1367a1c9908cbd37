use crate::advice_generator::{AdviceGenerator, AdviceOutcome};
use crate::errors::ApplicationResult;
use chrono::{DateTime, Utc};
use common::OperationTimer;
use domain::{ItemId, Tracker};
use memory::{AdviceStagingStore, CheckpointStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollReport {
    pub fetched: usize,
    pub posted: usize,
    pub staged: usize,
    pub guarded: usize,
    /// Already pending or already handled at the boundary
    pub skipped: usize,
    pub failed: usize,
    pub boundary: Option<DateTime<Utc>>,
}

/// Detects new items and drives advice generation for each of them.
///
/// List results carry no journals, so every candidate is fetched on its own
/// before the guard runs.
///
/// The tracker filter is inclusive, so items created exactly at the boundary
/// come back on the next tick. Their ids are remembered for as long as the
/// boundary stays put and are not processed twice.
pub struct IssuePollingJob {
    tracker: Arc<dyn Tracker>,
    checkpoint: Arc<CheckpointStore>,
    staging: Arc<AdviceStagingStore>,
    generator: Arc<AdviceGenerator>,
    boundary_seen: Mutex<HashSet<ItemId>>,
}

impl IssuePollingJob {
    pub fn new(
        tracker: Arc<dyn Tracker>,
        checkpoint: Arc<CheckpointStore>,
        staging: Arc<AdviceStagingStore>,
        generator: Arc<AdviceGenerator>,
    ) -> Self {
        Self {
            tracker,
            checkpoint,
            staging,
            generator,
            boundary_seen: Mutex::new(HashSet::new()),
        }
    }

    pub async fn run_once(&self) -> ApplicationResult<PollReport> {
        let timer = OperationTimer::new("issue_polling");
        let mut seen = self.boundary_seen.lock().await;
        let boundary = self.checkpoint.boundary().await;

        let mut items = self.tracker.items_since(boundary).await?;
        items.sort_by_key(|item| item.created_on);

        let mut report = PollReport {
            fetched: items.len(),
            boundary: Some(boundary),
            ..PollReport::default()
        };

        for listed in &items {
            let handled = listed.created_on < boundary
                || (listed.created_on == boundary && seen.contains(&listed.id));
            if handled {
                report.skipped += 1;
                continue;
            }

            let item = match self.tracker.item(listed.id).await {
                Ok(item) => item,
                Err(e) => {
                    warn!(
                        item_id = listed.id,
                        operation = "fetch_item",
                        category = e.category(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "Item fetch failed, continuing with the batch"
                    );
                    report.failed += 1;
                    continue;
                }
            };
            if self.generator.guard().is_guarded(&item) {
                debug!(item_id = item.id, "Skipping item with an AI comment");
                report.guarded += 1;
                continue;
            }
            if self.staging.pending_for_item(item.id).await.is_some() {
                debug!(item_id = item.id, "Skipping item with pending advice");
                report.skipped += 1;
                continue;
            }

            match self.generator.advise(&item).await {
                Ok(AdviceOutcome::Posted) => report.posted += 1,
                Ok(AdviceOutcome::Staged { .. }) => report.staged += 1,
                Ok(AdviceOutcome::AlreadyAdvised) => report.guarded += 1,
                Err(e) => {
                    warn!(
                        item_id = item.id,
                        operation = "generate_advice",
                        category = e.category(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "Advice generation failed, continuing with the batch"
                    );
                    report.failed += 1;
                }
            }
        }

        if let Some(latest) = items.iter().map(|item| item.created_on).max() {
            let at_latest = items
                .iter()
                .filter(|item| item.created_on == latest)
                .map(|item| item.id);
            if latest > boundary {
                self.checkpoint.advance(latest).await?;
                *seen = at_latest.collect();
                report.boundary = Some(latest);
            } else if latest == boundary {
                seen.extend(at_latest);
            }
        }

        info!(
            fetched = report.fetched,
            posted = report.posted,
            staged = report.staged,
            guarded = report.guarded,
            skipped = report.skipped,
            failed = report.failed,
            "Polling tick finished"
        );
        timer.finish();
        Ok(report)
    }
}
