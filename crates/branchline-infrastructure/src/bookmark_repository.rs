//! Key-value backed implementation of the BookmarkRepository trait.

use crate::storage::KeyValueStore;
use async_trait::async_trait;
use branchline_core::bookmark::{BookmarkMap, BookmarkRepository};
use branchline_core::{BranchlineError, Result};

pub const BOOKMARK_KEY_PREFIX: &str = "bookmarks:";

pub fn bookmark_key(conversation_id: &str) -> String {
    format!("{BOOKMARK_KEY_PREFIX}{conversation_id}")
}

/// Bookmarks stored as one name → message id map per conversation.
pub struct KvBookmarkRepository<S> {
    store: S,
}

impl<S: KeyValueStore> KvBookmarkRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn write(&self, conversation_id: &str, bookmarks: &BookmarkMap) -> Result<()> {
        let key = bookmark_key(conversation_id);
        if bookmarks.is_empty() {
            self.store.delete(&key).await?;
        } else {
            self.store.put(&key, serde_json::to_value(bookmarks)?).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValueStore> BookmarkRepository for KvBookmarkRepository<S> {
    async fn list(&self, conversation_id: &str) -> Result<BookmarkMap> {
        let key = bookmark_key(conversation_id);
        match self.store.get(&key).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                BranchlineError::storage(format!("Invalid bookmark data under '{}': {}", key, e))
            }),
            None => Ok(BookmarkMap::new()),
        }
    }

    async fn save(&self, conversation_id: &str, name: &str, message_id: &str) -> Result<()> {
        let mut bookmarks = self.list(conversation_id).await?;
        bookmarks.insert(name.to_string(), message_id.to_string());
        self.write(conversation_id, &bookmarks).await
    }

    async fn remove(&self, conversation_id: &str, name: &str) -> Result<bool> {
        let mut bookmarks = self.list(conversation_id).await?;
        if bookmarks.remove(name).is_none() {
            return Ok(false);
        }
        self.write(conversation_id, &bookmarks).await?;
        Ok(true)
    }
}
