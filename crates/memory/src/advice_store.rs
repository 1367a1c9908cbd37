//! Advice staging store
//!
//! Holds generated advice until an operator approves or rejects it. There
//! is at most one live entry per item. Every mutation reloads the record
//! under the repository's record lock, so the daemon and a CLI invocation
//! see each other's changes.
//!
//! Posting a comment, through approval or directly in auto mode, happens
//! under the same locks and re-checks the item's journals first: an item
//! that already carries a signed note is never commented on again.

use domain::services::content::compose_comment;
use domain::{
    DomainError, DomainResult, ItemId, ItemSnapshot, PendingAdvice, StateRepository,
    StateRepositoryExt, Tracker,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PENDING_ADVICE_KEY: &str = "pending_advice";

type Entries = HashMap<String, PendingAdvice>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Posted,
    /// A signed note was already present; nothing was posted
    AlreadyAdvised,
}

/// Result of approving a pending entry. The entry is gone either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approval {
    pub item_id: ItemId,
    pub outcome: PostOutcome,
}

pub struct AdviceStagingStore {
    repo: Arc<dyn StateRepository>,
    tracker: Arc<dyn Tracker>,
    signature: String,
    entries: Mutex<Entries>,
}

impl AdviceStagingStore {
    /// Load persisted entries; an unreadable record starts empty
    pub async fn open(
        repo: Arc<dyn StateRepository>,
        tracker: Arc<dyn Tracker>,
        signature: impl Into<String>,
    ) -> Self {
        let entries = match repo.load_json::<Entries>(PENDING_ADVICE_KEY).await {
            Ok(Some(entries)) => entries,
            Ok(None) => Entries::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Pending advice unreadable, starting empty");
                Entries::new()
            }
        };

        Self {
            repo,
            tracker,
            signature: signature.into(),
            entries: Mutex::new(entries),
        }
    }

    /// Replace the cached entries with the persisted record
    async fn refresh(&self, entries: &mut Entries) {
        match self.repo.load_json::<Entries>(PENDING_ADVICE_KEY).await {
            Ok(Some(persisted)) => *entries = persisted,
            Ok(None) => entries.clear(),
            Err(e) => {
                tracing::warn!(error = %e, "Pending advice unreadable, using last known entries")
            }
        }
    }

    async fn current(&self) -> Entries {
        let mut entries = self.entries.lock().await;
        self.refresh(&mut entries).await;
        entries.clone()
    }

    async fn commit(&self, entries: &mut Entries, next: Entries) -> DomainResult<()> {
        self.repo.save_json(PENDING_ADVICE_KEY, &next).await?;
        *entries = next;
        Ok(())
    }

    /// Stage advice for an item, superseding any entry it already has
    pub async fn stage(
        &self,
        item_id: ItemId,
        advice_content: String,
        snapshot: ItemSnapshot,
    ) -> DomainResult<String> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(PENDING_ADVICE_KEY).await?;
        self.refresh(&mut entries).await;

        let mut next = entries.clone();
        let superseded = next.len();
        next.retain(|_, pending| pending.item_id != item_id);
        let superseded = superseded - next.len();

        let pending = PendingAdvice::new(item_id, advice_content, snapshot);
        let id = pending.id.clone();
        next.insert(id.clone(), pending);
        self.commit(&mut entries, next).await?;

        tracing::info!(item_id, pending_id = %id, superseded, "Advice staged for approval");
        Ok(id)
    }

    /// All entries, newest first
    pub async fn list(&self) -> Vec<PendingAdvice> {
        let mut pending: Vec<PendingAdvice> = self.current().await.into_values().collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pending
    }

    pub async fn get(&self, id: &str) -> Option<PendingAdvice> {
        self.current().await.remove(id)
    }

    pub async fn pending_for_item(&self, item_id: ItemId) -> Option<PendingAdvice> {
        self.current()
            .await
            .into_values()
            .find(|pending| pending.item_id == item_id)
    }

    pub async fn count(&self) -> usize {
        self.current().await.len()
    }

    /// Post the approved advice unless the item already carries a signed
    /// note, then drop the entry. A failed fetch or post keeps the entry.
    pub async fn approve(&self, id: &str) -> DomainResult<Approval> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(PENDING_ADVICE_KEY).await?;
        self.refresh(&mut entries).await;

        let pending = entries
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("pending advice", id))?;

        let outcome = self
            .post_unless_advised(pending.item_id, &pending.advice_content)
            .await
            .map_err(|e| {
                tracing::warn!(
                    item_id = pending.item_id,
                    pending_id = id,
                    collaborator = "tracker",
                    error = %e,
                    "Approval failed, entry kept"
                );
                e
            })?;

        let mut next = entries.clone();
        next.remove(id);
        if let Err(e) = self.repo.save_json(PENDING_ADVICE_KEY, &next).await {
            tracing::error!(
                item_id = pending.item_id,
                pending_id = id,
                error = %e,
                "Approved entry handled but its removal was not persisted"
            );
        }
        *entries = next;

        match outcome {
            PostOutcome::Posted => {
                tracing::info!(item_id = pending.item_id, pending_id = id, "Advice approved and posted")
            }
            PostOutcome::AlreadyAdvised => tracing::info!(
                item_id = pending.item_id,
                pending_id = id,
                "Item already carries an AI comment, approved entry dropped without posting"
            ),
        }
        Ok(Approval {
            item_id: pending.item_id,
            outcome,
        })
    }

    /// Post advice straight to the tracker (auto mode). Serialized with
    /// approvals; a staged entry for the item is dropped once posted.
    pub async fn post_direct(&self, item_id: ItemId, advice: &str) -> DomainResult<PostOutcome> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(PENDING_ADVICE_KEY).await?;
        self.refresh(&mut entries).await;

        let outcome = self.post_unless_advised(item_id, advice).await?;
        if outcome == PostOutcome::Posted
            && entries.values().any(|pending| pending.item_id == item_id)
        {
            let mut next = entries.clone();
            next.retain(|_, pending| pending.item_id != item_id);
            if let Err(e) = self.commit(&mut entries, next).await {
                tracing::warn!(item_id, error = %e, "Failed to drop superseded pending advice");
            }
        }
        Ok(outcome)
    }

    async fn post_unless_advised(&self, item_id: ItemId, advice: &str) -> DomainResult<PostOutcome> {
        let fresh = self.tracker.item(item_id).await?;
        if fresh.has_signed_note(&self.signature) {
            return Ok(PostOutcome::AlreadyAdvised);
        }

        let comment = compose_comment(&self.signature, advice);
        self.tracker.post_comment(item_id, &comment).await?;
        Ok(PostOutcome::Posted)
    }

    /// Drop the entry without contacting the tracker
    pub async fn reject(&self, id: &str) -> DomainResult<PendingAdvice> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(PENDING_ADVICE_KEY).await?;
        self.refresh(&mut entries).await;

        let mut next = entries.clone();
        let pending = next
            .remove(id)
            .ok_or_else(|| DomainError::not_found("pending advice", id))?;
        self.commit(&mut entries, next).await?;

        tracing::info!(item_id = pending.item_id, pending_id = id, "Advice rejected");
        Ok(pending)
    }

    /// Drop every entry; returns how many were dropped
    pub async fn clear(&self) -> DomainResult<usize> {
        let mut entries = self.entries.lock().await;
        let _record = self.repo.lock(PENDING_ADVICE_KEY).await?;
        self.refresh(&mut entries).await;

        let removed = entries.len();
        self.commit(&mut entries, Entries::new()).await?;
        tracing::info!(removed, "Pending advice cleared");
        Ok(removed)
    }
}
