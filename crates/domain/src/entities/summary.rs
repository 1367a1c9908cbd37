//! Summary cache entities

use super::item::{Item, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summaries handed to the advice prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummaries {
    pub content_summary: String,
    pub journal_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub item_id: ItemId,
    pub content_signature: String,
    pub content_summary: String,
    #[serde(default)]
    pub journal_summary: Option<String>,
    pub journal_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl SummaryEntry {
    /// Change marker of an item: last-modified time plus number of journals
    pub fn signature_of(item: &Item) -> String {
        format!("{}|{}", item.updated_on.to_rfc3339(), item.journal_count())
    }

    pub fn summaries(&self) -> ItemSummaries {
        ItemSummaries {
            content_summary: self.content_summary.clone(),
            journal_summary: self.journal_summary.clone(),
        }
    }
}
