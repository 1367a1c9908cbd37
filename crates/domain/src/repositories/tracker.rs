//! Tracker - the external issue tracker as seen by the agent

use crate::entities::{Item, ItemId};
use crate::errors::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One page of the full item listing
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Total number of items reported by the tracker
    pub total_count: usize,
}

#[async_trait]
pub trait Tracker: Send + Sync {
    /// Items created at or after `since`, ascending by creation time.
    /// Journals may be missing; use [`Tracker::item`] for the history.
    async fn items_since(&self, since: DateTime<Utc>) -> DomainResult<Vec<Item>>;

    /// Single item with its journals
    async fn item(&self, id: ItemId) -> DomainResult<Item>;

    /// Append a comment to an item
    async fn post_comment(&self, id: ItemId, text: &str) -> DomainResult<()>;

    /// Page through all items. Journals may be missing, as for `items_since`.
    async fn items_page(&self, offset: usize, limit: usize) -> DomainResult<ItemPage>;
}
