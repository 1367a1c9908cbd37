use crate::errors::ApplicationResult;
use common::OperationTimer;
use domain::{Item, ItemId, RetrievalDocument, RetrievalIndex, Tracker};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    pub items: usize,
    /// Items whose embeddings were (re)computed
    pub embedded: usize,
    /// Items dropped because the tracker no longer has them
    pub removed: usize,
    /// Whether every item the tracker reported was seen; pruning needs it
    pub complete: bool,
}

/// Refreshes the retrieval index from the full item set.
///
/// Pages come from the list endpoint, which has no journals; each item is
/// fetched on its own so documents include the discussion.
pub struct KnowledgeUpdateJob {
    tracker: Arc<dyn Tracker>,
    index: Arc<dyn RetrievalIndex>,
    page_size: usize,
}

impl KnowledgeUpdateJob {
    pub fn new(tracker: Arc<dyn Tracker>, index: Arc<dyn RetrievalIndex>, page_size: usize) -> Self {
        Self {
            tracker,
            index,
            page_size: page_size.max(1),
        }
    }

    pub async fn run_once(&self) -> ApplicationResult<UpdateReport> {
        let timer = OperationTimer::new("knowledge_update");
        let mut report = UpdateReport::default();
        let mut present: Vec<ItemId> = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.tracker.items_page(offset, self.page_size).await?;
            let fetched = page.items.len();
            if fetched == 0 {
                report.complete = offset >= page.total_count;
                break;
            }

            let mut documents = Vec::with_capacity(fetched);
            for listed in page.items {
                let item = self.with_journals(listed).await;
                present.push(item.id);
                documents.push(RetrievalDocument::from_item(&item));
            }
            report.embedded += self.index.upsert(documents).await?;

            offset += fetched;
            debug!(offset, total = page.total_count, "Indexed item page");
            if offset >= page.total_count {
                report.complete = true;
                break;
            }
        }

        report.items = present.len();
        if report.complete {
            report.removed = self.index.retain(&present).await?;
        } else {
            warn!(
                seen = present.len(),
                offset,
                "Item walk ended early, stale items are not pruned this run"
            );
        }

        info!(
            items = report.items,
            embedded = report.embedded,
            removed = report.removed,
            complete = report.complete,
            "Knowledge update finished"
        );
        timer.finish();
        Ok(report)
    }

    /// The item with its journals; the listed copy if the fetch fails
    async fn with_journals(&self, listed: Item) -> Item {
        match self.tracker.item(listed.id).await {
            Ok(item) => item,
            Err(e) => {
                warn!(
                    item_id = listed.id,
                    operation = "fetch_item",
                    category = e.category(),
                    error = %e,
                    "Item fetch failed, indexing it without its discussion"
                );
                listed
            }
        }
    }
}
