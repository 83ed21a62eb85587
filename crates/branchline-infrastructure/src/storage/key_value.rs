//! String-keyed store of JSON values.
//!
//! The overlay and bookmark repositories share one flat namespace and tell
//! their entries apart by key prefix.

use super::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use branchline_core::{BranchlineError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

type Document = BTreeMap<String, Value>;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Removes a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, in ascending order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Store backed by a single JSON document on disk.
///
/// Each call reads the file fresh; writes are locked read-modify-write
/// cycles, so several processes may share one store file.
#[derive(Clone)]
pub struct JsonFileStore {
    file: Arc<AtomicJsonFile<Document>>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    async fn blocking<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&AtomicJsonFile<Document>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| BranchlineError::internal(format!("Store task failed: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.blocking(move |file| Ok(file.load()?.and_then(|mut doc| doc.remove(&key))))
            .await
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |file| {
            file.update(Document::new(), |doc| {
                doc.insert(key, value);
                Ok(())
            })?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.blocking(move |file| {
            if file.load()?.is_none_or(|doc| !doc.contains_key(&key)) {
                return Ok(false);
            }
            Ok(file.update(Document::new(), |doc| Ok(doc.remove(&key).is_some()))?)
        })
        .await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.blocking(move |file| {
            Ok(file
                .load()?
                .unwrap_or_default()
                .into_keys()
                .filter(|key| key.starts_with(&prefix))
                .collect())
        })
        .await
    }
}

/// In-process store, for tests and one-shot sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
