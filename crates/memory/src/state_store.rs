//! JSON state repositories
//!
//! `JsonFileStore` keeps one `<key>.json` file per record under a data
//! directory and replaces it through a uniquely named temp file plus rename.
//! Record locks are advisory `flock`s on a `.<key>.lock` file next to it, so
//! they hold across processes sharing the directory.

use async_trait::async_trait;
use domain::{DomainError, DomainResult, RecordLock, StateRepository};
use fs2::FileExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}.lock"))
    }
}

#[async_trait]
impl StateRepository for JsonFileStore {
    async fn read(&self, key: &str) -> DomainResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::persistence(key, e)),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> DomainResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::persistence(key, e))?;

        let target = self.path_for(key);
        let temp = self
            .dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DomainError::persistence(key, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DomainError::persistence(key, e));
        }

        tracing::trace!(key, bytes = bytes.len(), "State record written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::persistence(key, e)),
        }
    }

    async fn lock(&self, key: &str) -> DomainResult<RecordLock> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::persistence(key, e))?;

        let lock_path = self.lock_path_for(key);
        let owned_key = key.to_string();
        let lock_file = tokio::task::spawn_blocking(move || {
            let lock_file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(|e| DomainError::persistence(&owned_key, e))?;
            FileExt::lock_exclusive(&lock_file)
                .map_err(|e| DomainError::persistence(&owned_key, e))?;
            Ok::<_, DomainError>(lock_file)
        })
        .await
        .map_err(|e| DomainError::persistence(key, e))??;

        tracing::trace!(key, "State record locked");
        Ok(RecordLock::new(lock_file))
    }

    fn location(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// Process-local repository for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateRepository for InMemoryStateStore {
    async fn read(&self, key: &str) -> DomainResult<Option<Vec<u8>>> {
        Ok(self.records.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> DomainResult<()> {
        self.records.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn lock(&self, key: &str) -> DomainResult<RecordLock> {
        let record = self
            .locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        Ok(RecordLock::new(record.lock_owned().await))
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}
