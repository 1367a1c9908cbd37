//! Checkpoint store: the "new item" boundary of the polling job
//!
//! The persisted record is the source of truth; the in-memory copy only
//! answers when the record cannot be read.

use chrono::{DateTime, Utc};
use domain::{Checkpoint, DomainResult, StateRepository, StateRepositoryExt};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const CHECKPOINT_KEY: &str = "checkpoint";

pub struct CheckpointStore {
    repo: Arc<dyn StateRepository>,
    current: Mutex<Checkpoint>,
}

impl CheckpointStore {
    /// Load the persisted boundary. A missing or unreadable record starts
    /// over at the current time; this never fails.
    pub async fn open(repo: Arc<dyn StateRepository>) -> Self {
        let checkpoint = match repo.load_json::<Checkpoint>(CHECKPOINT_KEY).await {
            Ok(Some(checkpoint)) => {
                tracing::debug!(boundary = %checkpoint.last_check_time, "Checkpoint loaded");
                checkpoint
            }
            Ok(None) => {
                let fresh = Checkpoint::now();
                tracing::info!(
                    boundary = %fresh.last_check_time,
                    "No checkpoint found, starting from now"
                );
                Self::persist_initial(repo.as_ref(), &fresh).await;
                fresh
            }
            Err(e) => {
                let fresh = Checkpoint::now();
                tracing::warn!(
                    error = %e,
                    boundary = %fresh.last_check_time,
                    "Checkpoint unreadable, reinitializing to now"
                );
                Self::persist_initial(repo.as_ref(), &fresh).await;
                fresh
            }
        };

        Self {
            repo,
            current: Mutex::new(checkpoint),
        }
    }

    async fn persist_initial(repo: &dyn StateRepository, checkpoint: &Checkpoint) {
        if let Err(e) = repo.save_json(CHECKPOINT_KEY, checkpoint).await {
            tracing::warn!(error = %e, "Failed to persist initial checkpoint");
        }
    }

    async fn refresh(&self, current: &mut Checkpoint) {
        match self.repo.load_json::<Checkpoint>(CHECKPOINT_KEY).await {
            Ok(Some(persisted)) => *current = persisted,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Checkpoint unreadable, using last known value"),
        }
    }

    pub async fn boundary(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().await;
        self.refresh(&mut current).await;
        current.last_check_time
    }

    /// Move the boundary forward. Older or equal values are ignored and
    /// return `Ok(false)`; the in-memory value only changes once persisted.
    pub async fn advance(&self, new: DateTime<Utc>) -> DomainResult<bool> {
        let mut current = self.current.lock().await;
        let _record = self.repo.lock(CHECKPOINT_KEY).await?;
        self.refresh(&mut current).await;
        if new <= current.last_check_time {
            return Ok(false);
        }

        let next = Checkpoint::new(new);
        self.repo.save_json(CHECKPOINT_KEY, &next).await?;
        *current = next;
        tracing::debug!(boundary = %new, "Checkpoint advanced");
        Ok(true)
    }
}
