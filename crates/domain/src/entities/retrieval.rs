use super::item::{Item, ItemId};
use crate::services::content::render_item;
use crate::SimilarityScore;
use serde::{Deserialize, Serialize};

/// Unit handed to the retrieval index, keyed by item id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDocument {
    pub item_id: ItemId,
    pub text: String,
    pub subject: String,
    pub status: String,
    pub priority: String,
    pub tracker: String,
    pub updated_on: String,
}

impl RetrievalDocument {
    pub fn from_item(item: &Item) -> Self {
        Self {
            item_id: item.id,
            text: render_item(item),
            subject: item.subject.clone(),
            status: item.status.clone(),
            priority: item.priority.clone(),
            tracker: item.tracker.clone(),
            updated_on: item.updated_on.to_rfc3339(),
        }
    }
}

/// Ranked hit returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub item_id: ItemId,
    pub subject: String,
    pub content: String,
    pub similarity: SimilarityScore,
}
