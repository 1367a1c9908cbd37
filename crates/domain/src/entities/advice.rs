//! PendingAdvice - generated advice awaiting human approval

use super::item::{Item, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item fields captured at generation time for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub subject: String,
    pub description: String,
    pub project: String,
    pub tracker: String,
    pub priority: String,
    pub status: String,
    pub url: String,
}

impl ItemSnapshot {
    pub fn from_item(item: &Item, tracker_base_url: &str) -> Self {
        Self {
            subject: item.subject.clone(),
            description: item.description.clone(),
            project: item.project.clone(),
            tracker: item.tracker.clone(),
            priority: item.priority.clone(),
            status: item.status.clone(),
            url: format!("{}/issues/{}", tracker_base_url.trim_end_matches('/'), item.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAdvice {
    pub id: String,
    pub item_id: ItemId,
    pub item_snapshot: ItemSnapshot,
    pub advice_content: String,
    pub created_at: DateTime<Utc>,
}

impl PendingAdvice {
    /// New entry with a fresh opaque id
    pub fn new(item_id: ItemId, advice_content: String, item_snapshot: ItemSnapshot) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            item_id,
            item_snapshot,
            advice_content,
            created_at: Utc::now(),
        }
    }
}
