//! StateRepository - small key-value store for persisted agent state
//!
//! Each key holds one JSON record. Writes are atomic: a reader sees either
//! the previous record or the new one, never a torn file.
//!
//! Several processes may share one repository (the daemon and a CLI
//! invocation). A read-modify-write of a record happens under
//! [`StateRepository::lock`] and starts from a fresh read.

use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Exclusive hold on one record, released on drop
pub struct RecordLock {
    _held: Box<dyn Send + Sync>,
}

impl RecordLock {
    pub fn new(held: impl Send + Sync + 'static) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for RecordLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordLock")
    }
}

#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Raw record, `None` when the key was never written
    async fn read(&self, key: &str) -> DomainResult<Option<Vec<u8>>>;

    async fn write(&self, key: &str, bytes: &[u8]) -> DomainResult<()>;

    async fn remove(&self, key: &str) -> DomainResult<()>;

    /// Wait for exclusive access to `key` among every holder of this
    /// repository, including other processes
    async fn lock(&self, key: &str) -> DomainResult<RecordLock>;

    /// Human-readable location of a key, shown by stats commands
    fn location(&self, key: &str) -> String;
}

/// Typed JSON access on top of any [`StateRepository`]
#[async_trait]
pub trait StateRepositoryExt: StateRepository {
    /// Decoded record; undecodable bytes surface as [`DomainError::Corrupted`]
    async fn load_json<T>(&self, key: &str) -> DomainResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.read(key).await? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| DomainError::Corrupted {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    async fn save_json<T>(&self, key: &str, value: &T) -> DomainResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|e| DomainError::persistence(key, e))?;
        self.write(key, &bytes).await
    }
}

impl<R: StateRepository + ?Sized> StateRepositoryExt for R {}
